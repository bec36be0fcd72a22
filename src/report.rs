use crate::index::ProjectIndex;

pub const REPORT_TITLE: &str = "# repobrief Report";

const CLOSING_GUIDANCE: &[&str] = &[
    "- The project index is in place; the next step is a generative backend that plans task execution on top of it.",
    "- Completion is then detected through the FINAL_REPORT protocol plus the report artifacts.",
];

/// Rendered report and its short summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    pub report: String,
    pub summary: String,
}

impl RenderedReport {
    pub fn into_parts(self) -> (String, String) {
        (self.report, self.summary)
    }
}

/// Renders `(report_text, summary_text)` for an index and the task that asked
/// for it. Pure; writing the report anywhere is up to the caller.
pub fn render(index: &ProjectIndex, task: &str) -> RenderedReport {
    RenderedReport {
        report: render_report(index, task),
        summary: render_summary(index, task),
    }
}

pub fn render_summary(index: &ProjectIndex, task: &str) -> String {
    let important = index.important_paths().collect::<Vec<_>>().join(", ");
    format!(
        "Project index built: {} files, {} bytes{}.\nRoot: {}\nTask: {}\nImportant files: {}",
        index.file_count,
        index.total_bytes,
        if index.truncated { " (scan stopped at budget)" } else { "" },
        index.root.display(),
        task,
        if important.is_empty() { "(none)" } else { important.as_str() }
    )
}

pub fn render_report(index: &ProjectIndex, task: &str) -> String {
    let mut sections: Vec<String> = Vec::new();

    sections.push(REPORT_TITLE.to_string());
    sections.push(String::new());

    sections.push("## Task".to_string());
    let task = task.trim();
    sections.push(if task.is_empty() { "(empty)".to_string() } else { task.to_string() });
    sections.push(String::new());

    sections.push("## Project Overview".to_string());
    sections.push(format!("- Root: `{}`", index.root.display()));
    sections.push(format!("- Files (counted/scanned): **{}**", index.file_count));
    sections.push(format!("- Total size (counted/scanned): **{}** bytes", index.total_bytes));
    if index.truncated {
        sections.push("- Scan stopped at a resource budget; the counts cover a prefix of the tree.".to_string());
    }
    sections.push(String::new());

    sections.push("## Important Files (heuristic)".to_string());
    if index.important.is_empty() {
        sections.push("- (none)".to_string());
    } else {
        for file in &index.important {
            sections.push(format!("- `{}` ({} bytes)", file.path, file.size));
        }
    }
    sections.push(String::new());

    sections.push("## Tree Preview (excerpt)".to_string());
    sections.push("```".to_string());
    sections.push(index.tree_preview.clone());
    sections.push("```".to_string());
    sections.push(String::new());

    sections.push("## Snippets (excerpt)".to_string());
    for file in index.important.iter().filter(|f| !f.snippet.is_empty()) {
        sections.push(format!("### {}", file.path));
        sections.push("```".to_string());
        sections.push(file.snippet.clone());
        sections.push("```".to_string());
        sections.push(String::new());
    }

    sections.push("## Assessment / Next Steps".to_string());
    sections.extend(CLOSING_GUIDANCE.iter().map(|line| line.to_string()));
    sections.push(String::new());

    sections.join("\n")
}
