use crate::preset::RendererFlags;

/// CSS injected next to the diagram. Rules are scoped to `class_name` so the
/// host page is left alone.
pub fn scoped_stylesheet(class_name: &str, flags: &RendererFlags) -> String {
    let mut css = format!(".{class_name} * {{ box-sizing: border-box; }}\n");
    if flags.grab_cursor {
        css.push_str(&format!(".{class_name} .flow-pane {{ cursor: grab; }}\n"));
        css.push_str(&format!(
            ".{class_name} .flow-pane.dragging {{ cursor: grabbing; }}\n"
        ));
    }
    css
}
