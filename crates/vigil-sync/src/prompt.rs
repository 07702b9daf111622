//! Task prompt assembly for the worker.

use vigil_transcript::Entry;

use crate::workspace::WorkspaceSnapshot;

pub fn build(entries: &[Entry], workspace: &WorkspaceSnapshot) -> String {
    let mut parts: Vec<String> = Vec::new();

    parts.push(
        "You are the workspace maintenance agent. Analyze a coding session \
         transcript and update the project's persistent knowledge base.\n\n\
         The workspace is a library of project knowledge — decisions, lessons, \
         architecture, gotchas. NOT a session log.\n\n\
         ## Current Workspace Root (.vigil/WORKSPACE.md)\n"
            .into(),
    );
    parts.push(if workspace.root.trim().is_empty() {
        "(empty — create it)".into()
    } else {
        workspace.root.clone()
    });

    if !workspace.pages.is_empty() {
        parts.push("\n## Current Workspace Pages\n".into());
        for (path, content) in &workspace.pages {
            parts.push(format!("<page path=\"{path}\">"));
            parts.push(content.trim_end().to_string());
            parts.push("</page>\n".into());
        }
    }

    parts.push("\n## Session Transcript\n".into());
    parts.push("```json".into());
    parts.push(serde_json::to_string_pretty(entries).unwrap_or_else(|_| "[]".into()));
    parts.push("```".into());

    parts.push(
        "\n## Task\n\n\
         Update the workspace with knowledge worth preserving: decisions and \
         rationale, lessons learned, architecture insights, key technical \
         details, open questions.\n\n\
         Rules:\n\
         - Write clean reference material. No timestamps, no \"in this session\".\n\
         - Update existing pages when the topic already has a page. Don't duplicate.\n\
         - Create new pages in `.vigil/workspace/` for substantial new topics.\n\
         - Every new page MUST be linked from `.vigil/WORKSPACE.md`.\n\
         - Remove information superseded by this session's work.\n\
         - If nothing worth preserving happened, say so and stop.\n\n\
         Use the Write tool (or Read then Edit) to update files."
            .into(),
    );

    parts.join("\n")
}
