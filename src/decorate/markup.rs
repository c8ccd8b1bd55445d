use serde::Serialize;

/// Small inline markers decorators attach to a node's label.
///
/// Decorators produce these instead of HTML so that their output can be
/// compared and snapshotted structurally; `render_html` turns them into what
/// the tree widget displays.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum NodeMarkup {
    /// Proportional rectangle showing a node's axis range within its
    /// parent's range.  All lengths are in pixels.
    RangeBar {
        icon_width: f64,
        width: f64,
        offset: f64,
    },
    /// Information link to an external data viewer.
    ViewerLink { href: String },
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

impl NodeMarkup {
    pub fn render_html(&self) -> String {
        match self {
            NodeMarkup::RangeBar {
                icon_width,
                width,
                offset,
            } => format!(
                concat!(
                    "<svg class=\"range\" width=\"{}\" height=\"12\">",
                    "<rect width=\"{}\" height=\"10\" x=\"{}\" style=\"fill:IndianRed;stroke:none\"/>",
                    "<rect width=\"{}\" height=\"10\" style=\"fill:none;stroke:black;stroke-width:1\"/>",
                    "</svg>"
                ),
                icon_width + 2.0,
                width,
                offset,
                icon_width
            ),
            NodeMarkup::ViewerLink { href } => format!(
                "<a href=\"{}\" style=\"text-decoration:none;\">&#9432;</a>",
                escape_attr(href)
            ),
        }
    }
}

#[test]
fn test_render_html() {
    let bar = NodeMarkup::RangeBar {
        icon_width: 75.0,
        width: 37.5,
        offset: 0.0,
    };
    assert_eq!(
        bar.render_html(),
        "<svg class=\"range\" width=\"77\" height=\"12\">\
         <rect width=\"37.5\" height=\"10\" x=\"0\" style=\"fill:IndianRed;stroke:none\"/>\
         <rect width=\"75\" height=\"10\" style=\"fill:none;stroke:black;stroke-width:1\"/>\
         </svg>"
    );

    let link = NodeMarkup::ViewerLink {
        href: "http://viewer/?pathlist=a+b&filename=c.nxz".to_string(),
    };
    assert_eq!(
        link.render_html(),
        "<a href=\"http://viewer/?pathlist=a+b&amp;filename=c.nxz\" \
         style=\"text-decoration:none;\">&#9432;</a>"
    );
}
