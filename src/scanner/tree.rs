/// Sorted listing of relative paths, capped at `max_lines` entries.
///
/// Overflow is summarised as a final `... (N more)` line.
pub fn render_tree_preview<'a, I>(relative_paths: I, max_lines: usize) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut paths: Vec<&str> = relative_paths.into_iter().collect();
    paths.sort_unstable();

    let mut lines: Vec<String> = paths.iter().take(max_lines).map(|p| p.to_string()).collect();
    if paths.len() > max_lines {
        lines.push(format!("... ({} more)", paths.len() - max_lines));
    }
    lines.join("\n")
}
