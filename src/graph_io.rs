use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use log::{info, warn};
use nom::branch::alt;
use nom::bytes::complete::{is_not, take_while1};
use nom::character::complete::{char, digit0, digit1, multispace1};
use nom::combinator::{map, opt, recognize, value};
use nom::multi::many0;
use nom::sequence::{delimited, pair, preceded, tuple};
use nom::IResult;

use crate::attribute::{AttrMap, AttrValue};
use crate::graph::Graph;
use crate::types::GraphError;

/// Parsed GML value. Lists only appear for the `graph`/`node`/`edge`
/// structure keys; everything attached to a node or edge is scalar.
#[derive(Debug, Clone, PartialEq)]
enum GmlValue {
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<(String, GmlValue)>),
}

/// Whitespace and `#` line comments.
fn sp(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), pair(char('#'), opt(is_not("\n")))),
        ))),
    )(input)
}

fn key(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

fn quoted(input: &str) -> IResult<&str, GmlValue> {
    map(
        delimited(char('"'), opt(is_not("\"")), char('"')),
        |body: Option<&str>| {
            GmlValue::Str(body.unwrap_or("").replace("&quot;", "\""))
        },
    )(input)
}

fn number(input: &str) -> IResult<&str, GmlValue> {
    let (rest, text) = recognize(tuple((
        opt(char('-')),
        digit1,
        opt(pair(char('.'), digit0)),
        opt(tuple((
            alt((char('e'), char('E'))),
            opt(alt((char('+'), char('-')))),
            digit1,
        ))),
    )))(input)?;

    let parsed = if text.contains(&['.', 'e', 'E'][..]) {
        text.parse::<f64>().ok().map(GmlValue::Float)
    } else {
        text.parse::<i64>().ok().map(GmlValue::Int)
    };
    match parsed {
        Some(v) => Ok((rest, v)),
        None => Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Digit,
        ))),
    }
}

fn list(input: &str) -> IResult<&str, GmlValue> {
    map(
        delimited(char('['), many0(entry), preceded(sp, char(']'))),
        GmlValue::List,
    )(input)
}

fn entry(input: &str) -> IResult<&str, (String, GmlValue)> {
    let (input, _) = sp(input)?;
    let (input, k) = key(input)?;
    let (input, _) = sp(input)?;
    let (input, v) = alt((quoted, list, number))(input)?;
    Ok((input, (k.to_string(), v)))
}

fn document(input: &str) -> IResult<&str, Vec<(String, GmlValue)>> {
    let (input, entries) = many0(entry)(input)?;
    let (input, _) = sp(input)?;
    Ok((input, entries))
}

/// Normalize a sign value the way the reference loader does: `"+"`/`"-"`
/// become ±1, numeric strings are parsed, anything unreadable falls back to
/// +1 with a warning.
fn normalize_sign(value: GmlValue) -> AttrValue {
    match value {
        GmlValue::Str(s) => match s.as_str() {
            "+" => AttrValue::Int(1),
            "-" => AttrValue::Int(-1),
            other => match other.parse::<i64>() {
                Ok(parsed) => AttrValue::Int(parsed),
                Err(_) => {
                    warn!("could not convert sign value '{}' to integer, using +1", other);
                    AttrValue::Int(1)
                }
            },
        },
        GmlValue::Int(i) => AttrValue::Int(i),
        GmlValue::Float(f) => AttrValue::Int(f as i64),
        GmlValue::List(_) => {
            warn!("sign value is not scalar, using +1");
            AttrValue::Int(1)
        }
    }
}

fn scalar_attr(value: GmlValue) -> Option<AttrValue> {
    match value {
        GmlValue::Int(i) => Some(AttrValue::Int(i)),
        GmlValue::Float(f) => Some(AttrValue::Float(f)),
        GmlValue::Str(s) => Some(AttrValue::Str(s)),
        GmlValue::List(_) => None,
    }
}

/// Read a graph from a GML file. Node `label`s become node ids (falling back
/// to the numeric `id`), scalar attributes are preserved on nodes and edges,
/// and `sign` attributes are normalized to integers on the way in.
pub fn read_graph(path: &Path) -> Result<Graph, GraphError> {
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            GraphError::NotFound(format!("file '{}' could not be found", path.display()))
        }
        _ => GraphError::Io(e),
    })?;

    let (_, entries) = document(&text).map_err(|e| {
        GraphError::Parse(format!("'{}' is not valid GML: {}", path.display(), e))
    })?;
    let Some(GmlValue::List(items)) = entries
        .into_iter()
        .find(|(k, _)| k == "graph")
        .map(|(_, v)| v)
    else {
        return Err(GraphError::Parse(format!(
            "'{}' contains no 'graph' section",
            path.display()
        )));
    };

    let mut graph = Graph::new();
    let mut names = BTreeMap::<i64, String>::new();

    for (kind, value) in &items {
        if kind != "node" {
            continue;
        }
        let GmlValue::List(fields) = value else {
            return Err(GraphError::Parse("malformed 'node' section".to_string()));
        };
        let mut id = None;
        let mut label = None;
        let mut attrs = AttrMap::new();
        for (field, field_value) in fields {
            match field.as_str() {
                "id" => id = field_value.clone().into_int(),
                "label" => {
                    if let GmlValue::Str(s) = field_value {
                        label = Some(s.clone());
                    }
                }
                _ => {
                    if let Some(attr) = scalar_attr(field_value.clone()) {
                        attrs.insert(field.clone(), attr);
                    }
                }
            }
        }
        let Some(id) = id else {
            return Err(GraphError::Parse("node without an 'id' field".to_string()));
        };
        let name = label.unwrap_or_else(|| id.to_string());
        graph.insert_node(&name);
        for (key, attr) in attrs {
            graph.set_node_attr(&name, &key, attr);
        }
        names.insert(id, name);
    }

    for (kind, value) in &items {
        if kind != "edge" {
            continue;
        }
        let GmlValue::List(fields) = value else {
            return Err(GraphError::Parse("malformed 'edge' section".to_string()));
        };
        let mut source = None;
        let mut target = None;
        let mut attrs = AttrMap::new();
        for (field, field_value) in fields {
            match field.as_str() {
                "source" => source = field_value.clone().into_int(),
                "target" => target = field_value.clone().into_int(),
                "sign" => {
                    attrs.insert("sign".to_string(), normalize_sign(field_value.clone()));
                }
                _ => {
                    if let Some(attr) = scalar_attr(field_value.clone()) {
                        attrs.insert(field.clone(), attr);
                    }
                }
            }
        }
        let (Some(source), Some(target)) = (source, target) else {
            return Err(GraphError::Parse(
                "edge without 'source' and 'target' fields".to_string(),
            ));
        };
        let (Some(u), Some(v)) = (names.get(&source), names.get(&target)) else {
            return Err(GraphError::Parse(format!(
                "edge references unknown node id {} or {}",
                source, target
            )));
        };
        let (u, v) = (u.clone(), v.clone());
        if !graph.insert_edge(&u, &v) {
            warn!("ignoring self loop or duplicate edge ({}, {})", u, v);
            continue;
        }
        for (key, attr) in attrs {
            graph.set_edge_attr(&u, &v, &key, attr);
        }
    }

    info!(
        "graph loaded from '{}': {} nodes, {} edges",
        path.display(),
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}

impl GmlValue {
    fn into_int(self) -> Option<i64> {
        match self {
            GmlValue::Int(i) => Some(i),
            _ => None,
        }
    }
}

fn format_attr(out: &mut String, indent: &str, key: &str, value: &AttrValue) {
    match value {
        AttrValue::Int(i) => {
            let _ = writeln!(out, "{}{} {}", indent, key, i);
        }
        AttrValue::Float(f) => {
            let mut text = format!("{}", f);
            if !text.contains(&['.', 'e', 'E', 'n', 'i'][..]) {
                text.push_str(".0");
            }
            let _ = writeln!(out, "{}{} {}", indent, key, text);
        }
        AttrValue::Str(s) => {
            let _ = writeln!(out, "{}{} \"{}\"", indent, key, s.replace('"', "&quot;"));
        }
        AttrValue::Bool(b) => {
            let _ = writeln!(out, "{}{} {}", indent, key, i64::from(*b));
        }
    }
}

/// Serialize the graph, with all node and edge attribute maps, back to GML.
/// Numeric ids are assigned by node order and the node id string is kept in
/// the `label` field, so a save/reload cycle round-trips the graph.
pub fn write_graph(graph: &Graph, path: &Path) -> Result<(), GraphError> {
    let ids: BTreeMap<&str, usize> = graph
        .nodes()
        .enumerate()
        .map(|(i, node)| (node, i))
        .collect();

    let mut out = String::from("graph [\n");
    for node in graph.nodes() {
        out.push_str("  node [\n");
        let _ = writeln!(out, "    id {}", ids[node]);
        let _ = writeln!(out, "    label \"{}\"", node.replace('"', "&quot;"));
        if let Some(attrs) = graph.node_attr_map(node) {
            for (key, attr) in attrs {
                format_attr(&mut out, "    ", key, attr);
            }
        }
        out.push_str("  ]\n");
    }
    for edge in graph.edges() {
        let (u, v) = edge.endpoints();
        out.push_str("  edge [\n");
        let _ = writeln!(out, "    source {}", ids[u]);
        let _ = writeln!(out, "    target {}", ids[v]);
        if let Some(attrs) = graph.edge_attr_map(edge) {
            for (key, attr) in attrs {
                format_attr(&mut out, "    ", key, attr);
            }
        }
        out.push_str("  ]\n");
    }
    out.push_str("]\n");

    fs::write(path, out)?;
    info!("graph saved to '{}'", path.display());
    Ok(())
}

#[cfg(test)]
mod test_graph_io {
    use crate::attribute::AttrValue;
    use crate::graph::Graph;
    use crate::graph_io::{read_graph, write_graph};
    use crate::types::GraphError;

    #[test]
    fn test_round_trip_preserves_attributes() {
        let mut g = Graph::new();
        g.insert_edge("A", "B");
        g.insert_edge("B", "C");
        g.set_node_attr("A", "color", AttrValue::from("red"));
        g.set_node_attr("B", "score", AttrValue::Float(2.5));
        g.set_node_attr("C", "rank", AttrValue::Int(7));
        g.set_edge_attr("A", "B", "sign", AttrValue::Int(-1));
        g.set_edge_attr("B", "C", "neighborhood_overlap", AttrValue::Float(0.0));

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("round_trip.gml");
        write_graph(&g, &file).unwrap();
        let reloaded = read_graph(&file).unwrap();

        assert_eq!(reloaded.node_count(), 3);
        assert_eq!(reloaded.edge_count(), 2);
        assert_eq!(reloaded.node_attr("A", "color"), Some(&AttrValue::from("red")));
        assert_eq!(reloaded.node_attr("B", "score"), Some(&AttrValue::Float(2.5)));
        assert_eq!(reloaded.node_attr("C", "rank"), Some(&AttrValue::Int(7)));
        assert_eq!(reloaded.edge_attr("A", "B", "sign"), Some(&AttrValue::Int(-1)));
        assert_eq!(
            reloaded.edge_attr("C", "B", "neighborhood_overlap"),
            Some(&AttrValue::Float(0.0))
        );
    }

    #[test]
    fn test_sign_strings_are_normalized() {
        let text = r#"
graph [
  node [
    id 0
    label "A"
  ]
  node [
    id 1
    label "B"
  ]
  node [
    id 2
    label "C"
  ]
  edge [
    source 0
    target 1
    sign "-"
  ]
  edge [
    source 1
    target 2
    sign "+"
  ]
]
"#;
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("signed.gml");
        std::fs::write(&file, text).unwrap();

        let g = read_graph(&file).unwrap();
        assert_eq!(g.edge_attr("A", "B", "sign"), Some(&AttrValue::Int(-1)));
        assert_eq!(g.edge_attr("B", "C", "sign"), Some(&AttrValue::Int(1)));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = read_graph(std::path::Path::new("no_such_file.gml")).unwrap_err();
        assert!(matches!(err, GraphError::NotFound(_)));
    }

    #[test]
    fn test_nodes_without_labels_use_numeric_ids() {
        let text = "graph [\n node [ id 10 ]\n node [ id 11 ]\n edge [ source 10 target 11 ]\n]\n";
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bare.gml");
        std::fs::write(&file, text).unwrap();

        let g = read_graph(&file).unwrap();
        assert!(g.has_edge("10", "11"));
    }
}
