//! The configuration handle passed through every round: a shared graph plus
//! the mapping between origins and filesystem paths.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use depgraph_core::{Node, OriginId};

use crate::shared::SharedGraph;

/// Maps origins to source paths and back.
pub trait PathMapper: Send + Sync {
    fn to_path(&self, origin: &OriginId) -> PathBuf;

    fn to_origin(&self, path: &Path) -> OriginId;
}

/// Origins are `/`-separated paths relative to a root directory.
#[derive(Debug, Clone)]
pub struct RelativePathMapper {
    root: PathBuf,
}

impl RelativePathMapper {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        RelativePathMapper { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl PathMapper for RelativePathMapper {
    fn to_path(&self, origin: &OriginId) -> PathBuf {
        let path = Path::new(origin.as_str());
        if path.is_absolute() {
            return path.to_path_buf();
        }
        origin
            .as_str()
            .split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |path, part| path.join(part))
    }

    /// Paths outside the root keep their full form.
    fn to_origin(&self, path: &Path) -> OriginId {
        match path.strip_prefix(&self.root) {
            Ok(relative) => {
                let parts: Vec<String> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                OriginId::new(parts.join("/"))
            }
            Err(_) => OriginId::new(path.to_string_lossy().into_owned()),
        }
    }
}

/// Graph plus path mapper.
pub struct GraphConfiguration<N> {
    graph: SharedGraph<N>,
    path_mapper: Arc<dyn PathMapper>,
}

impl<N> Clone for GraphConfiguration<N> {
    fn clone(&self) -> Self {
        GraphConfiguration {
            graph: self.graph.clone(),
            path_mapper: Arc::clone(&self.path_mapper),
        }
    }
}

impl<N: Node> GraphConfiguration<N> {
    pub fn new(graph: SharedGraph<N>, path_mapper: Arc<dyn PathMapper>) -> Self {
        GraphConfiguration { graph, path_mapper }
    }

    pub fn graph(&self) -> &SharedGraph<N> {
        &self.graph
    }

    pub fn path_mapper(&self) -> &dyn PathMapper {
        self.path_mapper.as_ref()
    }
}
