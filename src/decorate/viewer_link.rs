use super::{
    markup::NodeMarkup,
    pipeline::{Annotations, DecorationContext, Decorator},
};

pub const DEFAULT_VIEWER_URL: &str = "http://ncnr.nist.gov/ipeek/nexus-zip-viewer.html";

/// Build the viewer URL for a file path: directories joined with `+` as the
/// `pathlist`, the last segment as `filename`.
pub fn viewer_href(viewer_url: &str, full_path: &str) -> String {
    let mut segments: Vec<String> = full_path
        .split('/')
        .map(|s| urlencoding::encode(s).into_owned())
        .collect();
    let filename = segments.pop().unwrap_or_default();
    format!(
        "{}?pathlist={}&filename={}",
        viewer_url,
        segments.join("+"),
        filename
    )
}

/// Every node whose first child is a leaf gets a link to view that leaf's
/// file in an external viewer.
#[derive(Debug)]
pub struct ViewerLink {
    pub viewer_url: String,
}

impl Default for ViewerLink {
    fn default() -> Self {
        ViewerLink {
            viewer_url: DEFAULT_VIEWER_URL.to_string(),
        }
    }
}

impl Decorator for ViewerLink {
    fn name(&self) -> &'static str {
        "viewer_link"
    }

    fn decorate(&self, ctx: &DecorationContext, mut annotations: Annotations) -> Annotations {
        for (idx, node) in ctx.walk.node_list() {
            let fileinfo = match node.children.first().and_then(|c| c.fileinfo.as_ref()) {
                Some(fileinfo) => fileinfo,
                None => continue,
            };
            let href = viewer_href(&self.viewer_url, &fileinfo.filename);
            annotations
                .node_mut(idx)
                .markup
                .push(NodeMarkup::ViewerLink { href });
        }
        annotations
    }
}
