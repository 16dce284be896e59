//! Composes the final Markdown document: title, structure diagram, one block per file.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::classify::classify;
use crate::contract::{ContentRecord, ContentSource};
use crate::fetch::{fetch_all, FetchError, FetchTarget};
use crate::render::{collect_leaves, render_tree};
use crate::tree::{TreeError, TreeNode};

/// Path that is always placed first among the file sections.
pub const LEADING_FILE: &str = "README.md";

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("Error generating tree structure: {0}")]
    Render(#[from] TreeError),

    #[error("A critical error occurred during file processing: {0}")]
    Fetch(#[from] FetchError),
}

/// Ordered Markdown sections; joined by a blank line on output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    sections: Vec<String>,
}

impl Document {
    pub fn new(sections: Vec<String>) -> Self {
        Self { sections }
    }

    pub fn sections(&self) -> &[String] {
        &self.sections
    }

    pub fn to_markdown(&self) -> String {
        self.sections.join("\n\n")
    }
}

/// Builds [`Document`]s, fetching file contents through the injected source.
pub struct Assembler {
    content: Arc<dyn ContentSource>,
    concurrency: usize,
}

impl Assembler {
    pub fn new(content: Arc<dyn ContentSource>, concurrency: usize) -> Self {
        Self {
            content,
            concurrency,
        }
    }

    pub async fn assemble(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        tree: &TreeNode,
    ) -> Result<Document, AssembleError> {
        let mut sections = vec![format!("# {owner} - {repo}")];

        let structure = render_tree(tree)?;
        sections.push("## Structure".to_string());
        sections.push(structure);

        let leaves = order_for_document(collect_leaves(tree));
        debug!(owner, repo, leaves = leaves.len(), "Collected leaves for content fetch");

        let target = FetchTarget {
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch: branch.to_string(),
        };
        let records = fetch_all(
            Arc::clone(&self.content),
            &leaves,
            &target,
            self.concurrency,
        )
        .await?;

        let before = sections.len();
        sections.extend(
            records
                .iter()
                .filter(|record| record.fetched)
                .filter(|record| classify(&record.path, &record.name).is_include())
                .map(file_block),
        );

        info!(
            owner,
            repo,
            files = sections.len() - before,
            "Assembled markdown document"
        );
        Ok(Document::new(sections))
    }
}

/// `README.md` first, then everything else by path.
pub fn order_for_document(mut leaves: Vec<&TreeNode>) -> Vec<&TreeNode> {
    leaves.sort_by(|a, b| {
        let a_key = (a.path != LEADING_FILE, a.path.as_str());
        let b_key = (b.path != LEADING_FILE, b.path.as_str());
        a_key.cmp(&b_key)
    });
    leaves
}

/// A file section: heading with the name, then a fence labelled `<extension>:<path>`
/// holding the content verbatim.
pub fn file_block(record: &ContentRecord) -> String {
    format!(
        "# {}\n```{}:{}\n{}\n```",
        record.name,
        fence_language(&record.name),
        record.path,
        record.content
    )
}

/// Text after the final `.` of the file name, or the whole name when it has none.
pub fn fence_language(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}
