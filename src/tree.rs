use anyhow::Result;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

use crate::config::Config;
use crate::loader::{self, SpecFormat};

/// The eight operation keys a path item can carry.
pub const HTTP_VERBS: [&str; 8] = [
    "get", "post", "put", "delete", "patch", "options", "head", "trace",
];

pub fn is_http_verb(key: &str) -> bool {
    HTTP_VERBS.contains(&key.to_ascii_lowercase().as_str())
}

/// Hierarchical summary of the `paths` section: URL segments as inner
/// nodes, `[VERB]` markers as leaves. Children are kept sorted so the
/// rendered tree is stable across ingestions of the same document.
#[derive(Debug, Default)]
pub struct PathTree {
    root: Node,
}

#[derive(Debug, Default)]
struct Node {
    children: BTreeMap<String, Node>,
}

impl PathTree {
    pub fn build(document: &Value) -> Result<Self> {
        let paths = document
            .get("paths")
            .ok_or_else(|| anyhow::anyhow!("Invalid OpenAPI specification format. Missing 'paths' section."))?;
        let paths = paths.as_object().ok_or_else(|| {
            anyhow::anyhow!("Invalid OpenAPI specification format. 'paths' is not a mapping.")
        })?;

        let mut root = Node::default();
        for (path, item) in paths {
            let Some(item) = item.as_object() else {
                continue;
            };
            let mut node = &mut root;
            for segment in path.split('/').filter(|s| !s.is_empty()) {
                node = node.children.entry(segment.to_string()).or_default();
            }
            // A path of "/" lands its verbs directly under the root.
            for verb in item.keys().filter(|key| is_http_verb(key)) {
                node.children
                    .entry(format!("[{}]", verb.to_uppercase()))
                    .or_default();
            }
        }

        Ok(Self { root })
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    /// Renders the tree as the box-drawing preview stored on the contract
    /// row, starting with a `paths/` header line.
    pub fn render(&self) -> String {
        let mut lines = vec!["paths/".to_string()];
        render_children(&self.root, "", &mut lines);
        lines.join("\n")
    }
}

/// Run the tree command: parse a spec file and print its path tree without
/// touching the database.
pub fn run_tree(config: &Config, path: &Path, format: Option<SpecFormat>) -> Result<()> {
    let format = loader::effective_format(config, path, format)?;
    let spec = loader::load_spec(path, format)?;
    let tree = PathTree::build(&spec.document)?;

    if tree.is_empty() {
        println!("No API paths found in the specification.");
    } else {
        println!("{}", tree.render());
    }

    Ok(())
}

fn render_children(node: &Node, prefix: &str, lines: &mut Vec<String>) {
    let count = node.children.len();
    for (i, (label, child)) in node.children.iter().enumerate() {
        let last = i + 1 == count;
        let marker = if last { "└── " } else { "├── " };
        lines.push(format!("{}{}{}", prefix, marker, label));
        if !child.children.is_empty() {
            let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
            render_children(child, &child_prefix, lines);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_nested_segments_and_verbs() {
        let doc = json!({
            "paths": {
                "/users": {"get": {}, "post": {}},
                "/users/{id}": {"get": {}}
            }
        });
        let tree = PathTree::build(&doc).unwrap();
        let expected = "\
paths/
└── users
    ├── [GET]
    ├── [POST]
    └── {id}
        └── [GET]";
        assert_eq!(tree.render(), expected);
    }

    #[test]
    fn test_multiple_top_level_branches() {
        let doc = json!({
            "paths": {
                "/pets": {"get": {}},
                "/stores": {"get": {}}
            }
        });
        let tree = PathTree::build(&doc).unwrap();
        let rendered = tree.render();
        assert!(rendered.contains("├── pets"));
        assert!(rendered.contains("└── stores"));
    }

    #[test]
    fn test_root_path_verbs_land_at_top_level() {
        let doc = json!({"paths": {"/": {"get": {}}}});
        let tree = PathTree::build(&doc).unwrap();
        assert_eq!(tree.render(), "paths/\n└── [GET]");
    }

    #[test]
    fn test_non_verb_path_item_keys_are_ignored() {
        let doc = json!({
            "paths": {
                "/widgets": {
                    "get": {},
                    "parameters": [{"name": "q", "in": "query"}],
                    "summary": "widget ops"
                }
            }
        });
        let tree = PathTree::build(&doc).unwrap();
        let rendered = tree.render();
        assert!(rendered.contains("[GET]"));
        assert!(!rendered.contains("PARAMETERS"));
        assert!(!rendered.contains("SUMMARY"));
    }

    #[test]
    fn test_non_object_path_items_are_skipped() {
        let doc = json!({"paths": {"/broken": "not an object", "/ok": {"get": {}}}});
        let tree = PathTree::build(&doc).unwrap();
        let rendered = tree.render();
        assert!(rendered.contains("ok"));
        assert!(!rendered.contains("broken"));
    }

    #[test]
    fn test_empty_paths_renders_header_only() {
        let doc = json!({"paths": {}});
        let tree = PathTree::build(&doc).unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.render(), "paths/");
    }

    #[test]
    fn test_missing_paths_section_errors() {
        let doc = json!({"openapi": "3.0.0"});
        let err = PathTree::build(&doc).unwrap_err();
        assert!(err.to_string().contains("Missing 'paths' section"));
    }

    #[test]
    fn test_non_mapping_paths_section_errors() {
        let doc = json!({"paths": ["not", "a", "mapping"]});
        assert!(PathTree::build(&doc).is_err());
    }
}
