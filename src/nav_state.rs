use std::borrow::Cow;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::file_format::DataError;

/// Percent-encode each segment of a path, leaving the separators alone.
pub fn url_encode_path(path: &str) -> String {
    path.split('/')
        .map(|p| urlencoding::encode(p))
        .collect::<Vec<Cow<'_, str>>>()
        .join("/")
}

/// One browsed location: a datasource and the path within it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePath {
    pub source: String,
    pub path: String,
}

impl SourcePath {
    pub fn new(source: &str, path: &str) -> Self {
        SourcePath {
            source: source.to_string(),
            path: path.to_string(),
        }
    }

    /// The path split into its non-empty segments.
    pub fn pathlist(&self) -> Vec<String> {
        self.path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// What the browser's location records: the active instrument and every
/// open datasource, in display order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavState {
    pub instrument: String,
    pub sources: Vec<SourcePath>,
}

impl NavState {
    /// `?instrument=<id>&source=<s>&pathlist=<p>`, with the source/pathlist
    /// pair repeated per datasource.
    pub fn to_query_string(&self) -> String {
        let instrument = format!("instrument={}", urlencoding::encode(&self.instrument));
        let sources = self.sources.iter().map(|sp| {
            format!(
                "source={}&pathlist={}",
                urlencoding::encode(&sp.source),
                url_encode_path(&sp.path)
            )
        });
        format!("?{}", std::iter::once(instrument).chain(sources).join("&"))
    }

    /// Inverse of `to_query_string`.  A leading `?` is optional, unknown
    /// parameters are ignored, and every `pathlist` must follow a `source`.
    pub fn parse(query: &str) -> Result<NavState, DataError> {
        let query = query.strip_prefix('?').unwrap_or(query);

        let mut instrument = None;
        let mut sources = vec![];
        let mut pending_source: Option<String> = None;
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "instrument" => instrument = Some(value.into_owned()),
                "source" => {
                    if let Some(source) = pending_source.replace(value.into_owned()) {
                        return Err(DataError::MalformedNavState(format!(
                            "source {:?} has no pathlist",
                            source
                        )));
                    }
                }
                "pathlist" => match pending_source.take() {
                    Some(source) => sources.push(SourcePath {
                        source,
                        path: value.into_owned(),
                    }),
                    None => {
                        return Err(DataError::MalformedNavState(format!(
                            "pathlist {:?} has no source",
                            value
                        )))
                    }
                },
                _ => {}
            }
        }

        if let Some(source) = pending_source {
            return Err(DataError::MalformedNavState(format!(
                "source {:?} has no pathlist",
                source
            )));
        }
        let instrument = instrument
            .ok_or_else(|| DataError::MalformedNavState("no instrument".to_string()))?;

        Ok(NavState {
            instrument,
            sources,
        })
    }
}
