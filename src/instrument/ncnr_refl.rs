//! NCNR reflectometry.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::{
    decorate::{
        range::{PropagateAxisRange, RangeBars, DEFAULT_ICON_WIDTH, DEFAULT_PROPAGATE_UP_LEVELS},
        sample_description::SampleDescription,
        viewer_link::{ViewerLink, DEFAULT_VIEWER_URL},
        DecorationPipeline,
    },
    file_format::{
        key_path::{CategoryKeyList, KeyPath, Lookup},
        template::{CalcRequest, CalcResult, FileListItem, ModuleInstance, ReturnType, Template},
    },
    plottable::{zip_columns, AxisLabel, Axes, PlotOptions, Plottable, SeriesLabel},
};

use super::Instrument;

pub const INSTRUMENT_ID: &str = "ncnr.refl";

pub const REFLDATA_DATATYPE: &str = "ncnr.refl.refldata";
pub const FOOTPRINT_PARAMS_DATATYPE: &str = "ncnr.refl.footprint.params";
pub const POLDATA_DATATYPE: &str = "ncnr.refl.poldata";

const LOADER_MODULE: &str = "ncnr.refl.ncnr_load.cached";
const LOADER_TERMINAL: &str = "output";

/// Knobs for the decorators this instrument installs.
#[derive(Clone, Debug, PartialEq)]
pub struct NcnrReflOptions {
    /// Entry field holding the scan's primary axis values.
    pub axis: KeyPath,
    pub propagate_up_levels: usize,
    pub icon_width: f64,
    pub viewer_url: String,
}

impl Default for NcnrReflOptions {
    fn default() -> Self {
        NcnrReflOptions {
            axis: KeyPath::literal(&["x"]),
            propagate_up_levels: DEFAULT_PROPAGATE_UP_LEVELS,
            icon_width: DEFAULT_ICON_WIDTH,
            viewer_url: DEFAULT_VIEWER_URL.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct NcnrRefl {
    categories: CategoryKeyList,
    decorators: DecorationPipeline,
}

impl NcnrRefl {
    pub fn new(options: NcnrReflOptions) -> Self {
        let categories = CategoryKeyList::literal(&[
            &["sample", "name"],
            &["intent"],
            &["name"],
            &["polarization"],
        ]);

        let mut decorators = DecorationPipeline::new();
        decorators
            .register(Box::new(PropagateAxisRange {
                axis: options.axis,
                propagate_up_levels: options.propagate_up_levels,
            }))
            .register(Box::new(RangeBars {
                icon_width: options.icon_width,
            }))
            .register(Box::new(SampleDescription::default()))
            .register(Box::new(ViewerLink {
                viewer_url: options.viewer_url,
            }));

        NcnrRefl {
            categories,
            decorators,
        }
    }
}

fn loader_template() -> Template {
    Template {
        name: "loader_template".to_string(),
        description: "ReflData remote loader".to_string(),
        modules: vec![ModuleInstance {
            module: LOADER_MODULE.to_string(),
            version: Some("0.1".to_string()),
            config: Map::new(),
        }],
        wires: vec![],
        instrument: "ncnr.magik".to_string(),
        version: "0.0".to_string(),
    }
}

/// A field as display text; strings are used as-is and anything else that
/// is present is written as JSON.
fn text_field(entry: &Value, key: &str) -> Option<String> {
    match entry.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn axis_label(entry: &Value, label: &str, units: &str) -> String {
    format!(
        "{}({})",
        text_field(entry, label).unwrap_or_default(),
        text_field(entry, units).unwrap_or_default()
    )
}

/// Overlay every reflectivity curve in `entries` on one chart.  Axis labels
/// and transforms come from the last entry.
pub fn plot_refl(entries: &[Value]) -> Plottable {
    let column = |entry: &Value, key: &str| Lookup::from(entry.get(key)).column();

    let mut series = vec![];
    let mut data = vec![];
    let mut xlabel = "x-axis".to_string();
    let mut ylabel = "y-axis".to_string();
    let mut xtransform = None;
    let mut ytransform = None;
    for entry in entries {
        data.push(zip_columns(
            &column(entry, "x"),
            &column(entry, "v"),
            &column(entry, "dv"),
        ));
        series.push(SeriesLabel {
            label: format!(
                "{}:{}",
                Lookup::from(entry.get("name")).category_string(),
                Lookup::from(entry.get("entry")).category_string()
            ),
        });
        xlabel = axis_label(entry, "xlabel", "xunits");
        ylabel = axis_label(entry, "vlabel", "vunits");
        xtransform = text_field(entry, "xscale");
        ytransform = text_field(entry, "vscale");
    }

    Plottable::OneD {
        options: PlotOptions {
            series,
            axes: Axes {
                xaxis: AxisLabel { label: xlabel },
                yaxis: AxisLabel { label: ylabel },
            },
            xtransform,
            ytransform,
        },
        data,
    }
}

impl Instrument for NcnrRefl {
    fn id(&self) -> &str {
        INSTRUMENT_ID
    }

    fn categories(&self) -> &CategoryKeyList {
        &self.categories
    }

    fn decorators(&self) -> &DecorationPipeline {
        &self.decorators
    }

    fn loader_request(&self, files: &[FileListItem], return_type: ReturnType) -> CalcRequest {
        CalcRequest {
            template: loader_template(),
            config: BTreeMap::new(),
            module_id: 0,
            terminal_id: LOADER_TERMINAL.to_string(),
            return_type,
        }
        .with_filelist(files)
    }

    fn plot(&self, result: &CalcResult) -> Option<Plottable> {
        match result.datatype.as_str() {
            REFLDATA_DATATYPE => Some(plot_refl(&result.values)),
            FOOTPRINT_PARAMS_DATATYPE | POLDATA_DATATYPE => Some(Plottable::Params {
                params: result.values.clone(),
            }),
            other => {
                trace!(datatype = other, "no plot for datatype");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plottable::PlotPoint;
    use serde_json::json;

    #[test]
    fn test_categories_and_decorators() {
        let refl = NcnrRefl::new(NcnrReflOptions::default());
        let entry = json!({"sample": {"name": "S1"}, "intent": "specular", "name": "run1"});
        assert_eq!(
            refl.categories().categorize(&entry),
            vec!["S1", "specular", "run1", "(missing)"]
        );
        assert_eq!(
            refl.decorators().names(),
            vec!["propagate_axis_range", "range_bars", "sample_description", "viewer_link"]
        );
    }

    #[test]
    fn test_loader_request() {
        let refl = NcnrRefl::new(NcnrReflOptions::default());
        let files = vec![FileListItem {
            path: "ncnrdata/cgd/a.nxz.cgd".to_string(),
            source: "ncnr".to_string(),
            mtime: 1447353862,
        }];
        let req = refl.loader_request(&files, ReturnType::Plottable);
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "template": {
                    "name": "loader_template",
                    "description": "ReflData remote loader",
                    "modules": [{"module": "ncnr.refl.ncnr_load.cached", "version": "0.1", "config": {}}],
                    "wires": [],
                    "instrument": "ncnr.magik",
                    "version": "0.0"
                },
                "config": {"0": {"filelist": [
                    {"path": "ncnrdata/cgd/a.nxz.cgd", "source": "ncnr", "mtime": 1447353862}
                ]}},
                "module_id": 0,
                "terminal_id": "output",
                "return_type": "plottable"
            })
        );
        assert_eq!(req.filelist(), files);
    }

    #[test]
    fn test_plot_refl() {
        let entries = vec![
            json!({
                "name": "S1", "entry": "e1",
                "x": [0.1, 0.2], "v": [10.0, 5.0], "dv": [1.0, 0.5],
                "xlabel": "Qz", "xunits": "1/Ang", "vlabel": "counts", "vunits": "counts",
                "xscale": "linear", "vscale": "log"
            }),
            json!({"name": "S1", "entry": "e2", "x": [0.3], "v": [2.0, 1.0], "dv": [0.1],
                   "xlabel": "Qz", "xunits": "1/Ang", "vlabel": "counts", "vunits": "counts",
                   "xscale": "linear", "vscale": "log"}),
        ];
        let plottable = plot_refl(&entries);
        match plottable {
            Plottable::OneD { options, data } => {
                assert_eq!(options.series[0].label, "S1:e1");
                assert_eq!(options.series[1].label, "S1:e2");
                assert_eq!(options.axes.xaxis.label, "Qz(1/Ang)");
                assert_eq!(options.axes.yaxis.label, "counts(counts)");
                assert_eq!(options.xtransform.as_deref(), Some("linear"));
                assert_eq!(options.ytransform.as_deref(), Some("log"));
                assert_eq!(data[0][1], PlotPoint::with_y_error(0.2, 5.0, 0.5));
                // x and dv repeat their last value.
                assert_eq!(
                    data[1],
                    vec![
                        PlotPoint::with_y_error(0.3, 2.0, 0.1),
                        PlotPoint::with_y_error(0.3, 1.0, 0.1),
                    ]
                );
            }
            other => panic!("expected 1d plottable, got {:?}", other),
        }
    }

    #[test]
    fn test_plot_refl_null_keeps_pairing() {
        let entries = vec![json!({
            "name": "S1", "entry": "e1",
            "x": [1.0, 2.0, 3.0], "v": [10.0, null, 30.0], "dv": [1.0, 1.0, 1.0]
        })];
        match plot_refl(&entries) {
            Plottable::OneD { data, .. } => {
                assert_eq!(
                    data[0],
                    vec![
                        PlotPoint::with_y_error(1.0, 10.0, 1.0),
                        PlotPoint::with_y_error(3.0, 30.0, 1.0),
                    ]
                );
            }
            other => panic!("expected 1d plottable, got {:?}", other),
        }
    }

    #[test]
    fn test_plot_by_datatype() {
        let refl = NcnrRefl::new(NcnrReflOptions::default());
        let params = CalcResult {
            datatype: POLDATA_DATATYPE.to_string(),
            values: vec![json!({"polarization": "++"})],
        };
        assert_eq!(
            refl.plot(&params),
            Some(Plottable::Params {
                params: vec![json!({"polarization": "++"})]
            })
        );

        let unknown = CalcResult {
            datatype: "ncnr.refl.deadtime".to_string(),
            values: vec![],
        };
        assert_eq!(refl.plot(&unknown), None);
    }
}
