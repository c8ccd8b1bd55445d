use serde::{ser::SerializeTuple, Serialize, Serializer};
use serde_json::Value;

/// Renderer-agnostic description of a chart.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Plottable {
    /// One or more x/y series with error bounds.
    #[serde(rename = "1d")]
    OneD {
        options: PlotOptions,
        data: Vec<Vec<PlotPoint>>,
    },
    /// Values that are better shown as a parameter table than a chart.
    #[serde(rename = "params")]
    Params { params: Vec<Value> },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SeriesLabel {
    pub label: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AxisLabel {
    pub label: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Axes {
    pub xaxis: AxisLabel,
    pub yaxis: AxisLabel,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlotOptions {
    pub series: Vec<SeriesLabel>,
    pub axes: Axes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xtransform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ytransform: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorBounds {
    pub yupper: f64,
    pub ylower: f64,
    pub xupper: f64,
    pub xlower: f64,
}

/// One point, serialized as `[x, y, {yupper, ylower, xupper, xlower}]`.
#[derive(Clone, Debug, PartialEq)]
pub struct PlotPoint {
    pub x: f64,
    pub y: f64,
    pub bounds: ErrorBounds,
}

impl PlotPoint {
    /// A point with symmetric y error `dy` and no x error.
    pub fn with_y_error(x: f64, y: f64, dy: f64) -> Self {
        PlotPoint {
            x,
            y,
            bounds: ErrorBounds {
                yupper: y + dy,
                ylower: y - dy,
                xupper: x,
                xlower: x,
            },
        }
    }
}

impl Serialize for PlotPoint {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut tup = serializer.serialize_tuple(3)?;
        tup.serialize_element(&self.x)?;
        tup.serialize_element(&self.y)?;
        tup.serialize_element(&self.bounds)?;
        tup.end()
    }
}

/// Zip positional columns into points.  The longer of `x` and `y` sets the
/// length and a shorter column repeats its last value; the same goes for
/// `dy`, which counts as zero where it has nothing.  Positions where `x` or
/// `y` holds no number are skipped without shifting later points.
pub fn zip_columns(
    x: &[Option<f64>],
    y: &[Option<f64>],
    dy: &[Option<f64>],
) -> Vec<PlotPoint> {
    let len = x.len().max(y.len());
    let at = |col: &[Option<f64>], i: usize| -> Option<f64> {
        col.get(i).or_else(|| col.last()).copied().flatten()
    };
    (0..len)
        .filter_map(|i| {
            let xv = at(x, i)?;
            let yv = at(y, i)?;
            Some(PlotPoint::with_y_error(xv, yv, at(dy, i).unwrap_or(0.0)))
        })
        .collect()
}
