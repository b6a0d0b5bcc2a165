//! `INCLUDE other.ink`

use tracing::{debug, warn};

use super::InkParser;
use crate::ast::{NodeId, NodeKind};
use crate::engine::Rules;

impl InkParser<'_, '_> {
    /// Parses the named file in place. Missing files and cycles are reported
    /// and leave an empty include behind.
    pub(crate) fn include_statement(&mut self) -> Option<NodeId> {
        self.whitespace();
        self.parse_string("INCLUDE")?;
        self.whitespace();

        let Some(filename) = self.expect(
            |p| p.parser.parse_until_chars_from_str("\n\r"),
            "filename for include statement",
        ) else {
            return Some(self.alloc(NodeKind::IncludedFile { story: None }));
        };
        let filename = filename.trim_end().to_string();

        let path = self.session.resolver.resolve(&filename);
        if self.session.open_files.contains(&path) {
            warn!(path = %path.display(), "include cycle");
            self.error(format!("Recursive INCLUDE detected: '{}'.", path.display()));
            return Some(self.alloc(NodeKind::IncludedFile { story: None }));
        }

        let loaded = self.session.resolver.load(&path);
        let story = match loaded {
            Ok(text) => {
                debug!(path = %path.display(), "including");
                self.session.open_files.insert(path.clone());
                let story = InkParser::new(&text, Some(filename), &mut *self.session).parse_story();
                self.session.open_files.remove(&path);
                Some(Box::new(story))
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "include not loaded");
                self.error(format!("Failed to load: '{filename}'"));
                None
            }
        };

        Some(self.alloc(NodeKind::IncludedFile { story }))
    }
}
