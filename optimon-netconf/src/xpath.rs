//! Element path resolution over vendor XML with inconsistent namespaces.
//!
//! Vendors declare YANG namespaces at different depths and with different
//! prefixes, so a single namespace-qualified query cannot be trusted.
//! Resolution therefore runs an ordered chain of three total resolvers and
//! stops at the first non-empty result:
//!
//! 1. Namespace-qualified match using the configured prefix map
//! 2. The same walk ignoring namespaces (local names only)
//! 3. A recursive descendant walk that tolerates intermediate wrapper
//!    elements between path segments
//!
//! An exhausted chain means "zero matches", never an error.

use std::collections::HashMap;

use roxmltree::Node;

/// One parsed element path, e.g. `ws-port:waveserver-ports/ws-port:ports`.
#[derive(Debug, Clone, PartialEq)]
pub struct PathExpr {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq)]
struct Segment {
    prefix: Option<String>,
    local: String,
}

impl PathExpr {
    /// Parse a slash-separated element path. Leading `.//` and `/` markers
    /// are accepted and ignored; every path searches descendants first.
    pub fn parse(path: &str) -> Self {
        let trimmed = path.trim();
        let trimmed = trimmed.strip_prefix(".//").unwrap_or(trimmed);

        let segments = trimmed
            .split('/')
            .filter(|seg| !seg.is_empty() && *seg != ".")
            .map(|seg| match seg.split_once(':') {
                Some((prefix, local)) => Segment {
                    prefix: Some(prefix.to_string()),
                    local: local.to_string(),
                },
                None => Segment {
                    prefix: None,
                    local: seg.to_string(),
                },
            })
            .collect();

        Self { segments }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Find elements matching a path, running the resolver chain.
pub fn find_elements<'a, 'input>(
    root: Node<'a, 'input>,
    expr: &PathExpr,
    namespaces: &HashMap<String, String>,
) -> Vec<Node<'a, 'input>> {
    if expr.is_empty() {
        return vec![root];
    }

    let qualified = resolve_qualified(root, expr, namespaces);
    if !qualified.is_empty() {
        return qualified;
    }

    let local = resolve_local(root, expr);
    if !local.is_empty() {
        return local;
    }

    resolve_recursive(root, expr)
}

/// Tier 1: match local names and, where a segment carries a prefix, the
/// namespace URI it resolves to. A prefix missing from the map makes this
/// tier yield nothing; the chain continues.
fn resolve_qualified<'a, 'input>(
    root: Node<'a, 'input>,
    expr: &PathExpr,
    namespaces: &HashMap<String, String>,
) -> Vec<Node<'a, 'input>> {
    let mut current = vec![root];

    for (depth, segment) in expr.segments.iter().enumerate() {
        let uri = match &segment.prefix {
            Some(prefix) => match namespaces.get(prefix) {
                Some(uri) => Some(uri.as_str()),
                None => return Vec::new(),
            },
            None => None,
        };

        let matches = |node: &Node| {
            node.is_element()
                && node.tag_name().name() == segment.local
                && uri.is_none_or(|uri| node.tag_name().namespace() == Some(uri))
        };

        current = step(&current, depth == 0, &matches);
        if current.is_empty() {
            return current;
        }
    }

    current
}

/// Tier 2: the same walk with namespaces ignored entirely.
fn resolve_local<'a, 'input>(root: Node<'a, 'input>, expr: &PathExpr) -> Vec<Node<'a, 'input>> {
    let mut current = vec![root];

    for (depth, segment) in expr.segments.iter().enumerate() {
        let matches =
            |node: &Node| node.is_element() && node.tag_name().name() == segment.local;

        current = step(&current, depth == 0, &matches);
        if current.is_empty() {
            return current;
        }
    }

    current
}

/// Tier 3: every segment searches all descendants of the previous result
/// set, so unexpected wrapper elements between segments do not break the
/// match.
fn resolve_recursive<'a, 'input>(root: Node<'a, 'input>, expr: &PathExpr) -> Vec<Node<'a, 'input>> {
    let mut current = vec![root];

    for segment in &expr.segments {
        let matches =
            |node: &Node| node.is_element() && node.tag_name().name() == segment.local;

        let mut next: Vec<Node> = Vec::new();
        for node in &current {
            for found in node.descendants().filter(|n| *n != *node) {
                if matches(&found) && !next.contains(&found) {
                    next.push(found);
                }
            }
        }

        current = next;
        if current.is_empty() {
            return current;
        }
    }

    current
}

/// Advance one path step: descendants for the first segment, direct
/// children afterwards.
fn step<'a, 'input>(
    current: &[Node<'a, 'input>],
    descend: bool,
    matches: &dyn Fn(&Node) -> bool,
) -> Vec<Node<'a, 'input>> {
    let mut next: Vec<Node> = Vec::new();

    for node in current {
        if descend {
            for found in node.descendants().filter(|n| *n != *node) {
                if matches(&found) && !next.contains(&found) {
                    next.push(found);
                }
            }
        } else {
            for child in node.children() {
                if matches(&child) && !next.contains(&child) {
                    next.push(child);
                }
            }
        }
    }

    next
}

/// Get the trimmed text of a child element addressed by a simple name or a
/// nested path. Namespace prefixes on the path are tolerated and resolved
/// through the same chain.
pub fn child_text(
    node: Node,
    path: &str,
    namespaces: &HashMap<String, String>,
) -> Option<String> {
    if path.contains('/') {
        let expr = PathExpr::parse(path);
        return find_elements(node, &expr, namespaces)
            .first()
            .map(|n| n.text().unwrap_or_default().trim().to_string());
    }

    let local = path.rsplit(':').next().unwrap_or(path);
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == local)
        .map(|child| child.text().unwrap_or_default().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMESPACED: &str = r#"
        <data xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
            <waveserver-ports xmlns="urn:ciena:params:xml:ns:yang:ciena-ws-port">
                <ports>
                    <port-id>1-1</port-id>
                    <state><operational-state>up</operational-state></state>
                </ports>
                <ports>
                    <port-id>1-2</port-id>
                    <state><operational-state>down</operational-state></state>
                </ports>
            </waveserver-ports>
        </data>
    "#;

    fn ns() -> HashMap<String, String> {
        HashMap::from([(
            "ws-port".to_string(),
            "urn:ciena:params:xml:ns:yang:ciena-ws-port".to_string(),
        )])
    }

    #[test]
    fn test_parse_path() {
        let expr = PathExpr::parse(".//ws-port:waveserver-ports/ports");
        assert_eq!(expr.segments.len(), 2);
        assert_eq!(expr.segments[0].prefix.as_deref(), Some("ws-port"));
        assert_eq!(expr.segments[0].local, "waveserver-ports");
        assert_eq!(expr.segments[1].prefix, None);
    }

    #[test]
    fn test_qualified_match() {
        let doc = roxmltree::Document::parse(NAMESPACED).unwrap();
        let expr = PathExpr::parse("ws-port:waveserver-ports/ws-port:ports");

        let nodes = find_elements(doc.root(), &expr, &ns());
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn test_local_name_fallback_when_prefix_unknown() {
        let doc = roxmltree::Document::parse(NAMESPACED).unwrap();
        // Prefix is not in the namespace map; tier 1 yields nothing and the
        // local-name tier takes over.
        let expr = PathExpr::parse("mystery:waveserver-ports/mystery:ports");

        let nodes = find_elements(doc.root(), &expr, &HashMap::new());
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn test_local_name_fallback_when_namespace_differs() {
        let unprefixed = r#"
            <data>
                <waveserver-ports>
                    <ports><port-id>1-1</port-id></ports>
                </waveserver-ports>
            </data>
        "#;
        let doc = roxmltree::Document::parse(unprefixed).unwrap();
        // The configured URI does not appear in the document at all.
        let expr = PathExpr::parse("ws-port:waveserver-ports/ws-port:ports");

        let nodes = find_elements(doc.root(), &expr, &ns());
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn test_recursive_walk_tolerates_wrappers() {
        let wrapped = r#"
            <data>
                <rpc-reply>
                    <waveserver-ports>
                        <wrapper>
                            <ports><port-id>1-1</port-id></ports>
                        </wrapper>
                    </waveserver-ports>
                </rpc-reply>
            </data>
        "#;
        let doc = roxmltree::Document::parse(wrapped).unwrap();
        // "ports" is not a direct child of "waveserver-ports", so tiers 1
        // and 2 both miss; the recursive tier finds it.
        let expr = PathExpr::parse("waveserver-ports/ports");

        let nodes = find_elements(doc.root(), &expr, &HashMap::new());
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn test_no_match_is_empty_not_error() {
        let doc = roxmltree::Document::parse("<data/>").unwrap();
        let expr = PathExpr::parse("nothing/here");
        assert!(find_elements(doc.root(), &expr, &HashMap::new()).is_empty());
    }

    #[test]
    fn test_child_text_simple_and_nested() {
        let doc = roxmltree::Document::parse(NAMESPACED).unwrap();
        let expr = PathExpr::parse("waveserver-ports/ports");
        let first = find_elements(doc.root(), &expr, &HashMap::new())[0];

        assert_eq!(child_text(first, "port-id", &ns()).as_deref(), Some("1-1"));
        assert_eq!(
            child_text(first, "state/operational-state", &ns()).as_deref(),
            Some("up")
        );
        assert_eq!(child_text(first, "missing", &ns()), None);
    }

    #[test]
    fn test_child_text_ignores_prefix_on_simple_name() {
        let doc = roxmltree::Document::parse(NAMESPACED).unwrap();
        let expr = PathExpr::parse("waveserver-ports/ports");
        let first = find_elements(doc.root(), &expr, &HashMap::new())[0];

        assert_eq!(
            child_text(first, "ws-port:port-id", &ns()).as_deref(),
            Some("1-1")
        );
    }
}
