//! Mixed record kinds persisted through a tagged codec in SQLite.

use std::collections::BTreeSet;
use std::io::{Read, Write};
use std::sync::Arc;

use depgraph_core::codec::io::write_str;
use depgraph_core::codec::{
    decode_collection, encode_collection, ExternalizableCodec, PolymorphicCodec, TagRegistry,
    Tagged,
};
use depgraph_core::{CoreError, Difference, Externalizable, Node, OriginId, SymbolId, Usage};
use depgraph_graph::{Graph, GraphView};
use depgraph_storage::SqliteStore;

#[derive(Debug, Clone, PartialEq)]
enum Element {
    Type { id: SymbolId, usages: Vec<Usage> },
    Module { id: SymbolId, name: String },
}

#[derive(Debug)]
struct ElementDiff(bool);

impl Difference for ElementDiff {
    fn unchanged(&self) -> bool {
        !self.0
    }
}

impl Node for Element {
    type Diff = ElementDiff;

    fn id(&self) -> &SymbolId {
        match self {
            Element::Type { id, .. } | Element::Module { id, .. } => id,
        }
    }

    fn kind(&self) -> &str {
        match self {
            Element::Type { .. } => "type",
            Element::Module { .. } => "module",
        }
    }

    fn usages(&self) -> &[Usage] {
        match self {
            Element::Type { usages, .. } => usages,
            Element::Module { .. } => &[],
        }
    }

    fn difference(&self, past: &Self) -> ElementDiff {
        ElementDiff(self != past)
    }
}

fn usage_codec() -> ExternalizableCodec<Usage> {
    ExternalizableCodec::new(Usage::read_from)
}

impl Externalizable for Element {
    fn write_to(&self, out: &mut dyn Write) -> Result<(), CoreError> {
        match self {
            Element::Type { id, usages } => {
                id.write_to(out)?;
                encode_collection(&usage_codec(), out, usages)
            }
            Element::Module { id, name } => {
                id.write_to(out)?;
                write_str(out, name)
            }
        }
    }
}

impl Tagged for Element {
    fn tag(&self) -> u16 {
        match self {
            Element::Type { .. } => 1,
            Element::Module { .. } => 2,
        }
    }
}

fn read_type(input: &mut dyn Read) -> Result<Element, CoreError> {
    Ok(Element::Type {
        id: SymbolId::read_from(input)?,
        usages: decode_collection(&usage_codec(), input)?,
    })
}

fn read_module(input: &mut dyn Read) -> Result<Element, CoreError> {
    Ok(Element::Module {
        id: SymbolId::read_from(input)?,
        name: depgraph_core::codec::io::read_str(input)?,
    })
}

fn open(path: &str) -> Graph<Element> {
    let registry = TagRegistry::new()
        .register(1, read_type)
        .unwrap()
        .register(2, read_module)
        .unwrap();
    Graph::open(
        Arc::new(SqliteStore::open(path).unwrap()),
        Arc::new(PolymorphicCodec::new(registry)),
        Vec::new(),
    )
    .unwrap()
}

#[test]
fn mixed_records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mixed.db");
    let path = path.to_str().unwrap();

    let module = Element::Module {
        id: SymbolId::from("m"),
        name: "core".to_string(),
    };
    let ty = Element::Type {
        id: SymbolId::from("T"),
        usages: vec![Usage::with_detail("m", "import")],
    };
    {
        let mut graph = open(path);
        let mut delta = graph.create_delta(Vec::new(), Vec::new()).unwrap();
        delta.associate(module.clone(), &[OriginId::from("lib.rs")]).unwrap();
        delta.associate(ty.clone(), &[OriginId::from("lib.rs")]).unwrap();
        graph.integrate(&delta).unwrap();
    }

    let graph = open(path);
    let origin = OriginId::from("lib.rs");
    assert_eq!(graph.nodes(&origin).unwrap(), vec![ty.clone(), module.clone()]);
    assert_eq!(graph.nodes_of_kind(&origin, "module").unwrap(), vec![module]);
    let expected: BTreeSet<SymbolId> = [SymbolId::from("T")].into_iter().collect();
    assert_eq!(graph.depending_nodes(&SymbolId::from("m")).unwrap(), expected);
}
