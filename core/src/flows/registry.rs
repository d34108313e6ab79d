//! Flow registry
//!
//! Maps discovered flow files to the implementation that runs them.

use std::collections::HashMap;
use std::sync::Arc;

use super::{Flow, FlowFile, ScriptFlow};

/// Compiled-in flows keyed by the flow file name they stand for
#[derive(Default, Clone)]
pub struct FlowRegistry {
    compiled: HashMap<String, Arc<dyn Flow>>,
}

impl FlowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a compiled-in flow for files named `name`
    pub fn register(&mut self, name: impl Into<String>, flow: Arc<dyn Flow>) -> &mut Self {
        self.compiled.insert(name.into(), flow);
        self
    }

    pub fn with(mut self, name: impl Into<String>, flow: Arc<dyn Flow>) -> Self {
        self.register(name, flow);
        self
    }

    pub fn is_compiled(&self, name: &str) -> bool {
        self.compiled.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    /// The flow to run for a discovered file
    pub fn resolve(&self, file: &FlowFile) -> Arc<dyn Flow> {
        match self.compiled.get(&file.name) {
            Some(flow) => flow.clone(),
            None => Arc::new(ScriptFlow::new(file.path.clone())),
        }
    }
}

impl std::fmt::Debug for FlowRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.compiled.keys().collect();
        names.sort();
        f.debug_struct("FlowRegistry")
            .field("compiled", &names)
            .finish()
    }
}
