//! Builds a [`Dag`] from a generic document tree (§4.8): the `DAG` root, its `Vertices` (each
//! owning a `Task` of `Stages` plus an optional `Callback`), and its `Connections`.

use dagrunner_core::{Error, Identifier, Result};
use dagrunner_engine::{Dag, Stage, Task, TaskCallback, Vertex};
use dagrunner_registry::DynamicLibraryRegistry;
use serde_json::Value;

use crate::document::{self, SAMPLE_DOCUMENT};

/// Consumes a document tree and produces a runnable [`Dag`], resolving every `Stage` and
/// `Callback` symbol through a [`DynamicLibraryRegistry`] along the way.
///
/// Failure is total: if loading fails at any point, no partial `Dag` is returned — the
/// in-progress `Dag` the loader was building is simply dropped.
pub struct DagSpecLoader<'a> {
    registry: &'a DynamicLibraryRegistry,
}

impl<'a> DagSpecLoader<'a> {
    /// Creates a loader that resolves dynamic symbols through `registry`.
    #[must_use]
    pub const fn new(registry: &'a DynamicLibraryRegistry) -> Self {
        Self { registry }
    }

    /// Loads `document` into a fresh [`Dag`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::WrongRoot`] if the document has no `DAG` root; [`Error::WrongType`] or
    /// [`Error::MissingKey`] for a malformed vertex/task/stage/callback/connection record;
    /// [`Error::NotFound`] or [`Error::WouldBeCyclic`] for an invalid connection;
    /// [`Error::LibraryLoadFailed`] or [`Error::SymbolNotFound`] if a `Stage`/`Callback`
    /// symbol cannot be resolved.
    pub fn load(&self, document: &Value) -> Result<Dag> {
        let root = document
            .as_object()
            .ok_or_else(|| wrong_root_error(document))?;
        let dag_value = root.get("DAG").ok_or_else(|| wrong_root_error(document))?;
        let dag_object = document::object(dag_value, "DAG")?;

        let title = document::optional_str(dag_object, "Title")
            .unwrap_or("untitled")
            .to_string();
        tracing::debug!(title = %title, "loading DAG document");
        let mut dag = Dag::new(title);
        if let Some(configuration) = dag_object.get("Configuration") {
            dag.set_configuration(configuration.clone());
        }

        if let Some(vertices_value) = dag_object.get("Vertices") {
            let vertices = document::array(vertices_value, "DAG.Vertices")?;
            for (index, vertex_value) in vertices.iter().enumerate() {
                let context = format!("DAG.Vertices[{index}]");
                let vertex = self.load_vertex(vertex_value, &context)?;
                dag.add_vertex(vertex)?;
            }
        }

        if let Some(connections_value) = dag_object.get("Connections") {
            let connections = document::array(connections_value, "DAG.Connections")?;
            for (index, connection_value) in connections.iter().enumerate() {
                let context = format!("DAG.Connections[{index}]");
                let connection_object = document::object(connection_value, &context)?;
                let from = Identifier::parse(document::required_str(connection_object, "From", &context)?)?;
                let to = Identifier::parse(document::required_str(connection_object, "To", &context)?)?;
                dag.connect_by_id(from, to)?;
            }
        }

        Ok(dag)
    }

    fn load_vertex(&self, value: &Value, context: &str) -> Result<Vertex> {
        let object = document::object(value, context)?;
        let uuid_text = document::required_str(object, "UUID", context)?;
        let identifier = Identifier::parse(uuid_text)?;
        let name = document::optional_str(object, "Name").unwrap_or(uuid_text).to_string();

        let task_value = document::required(object, "Task", context)?;
        let task_context = format!("{context}.Task");
        let task = self.load_task(task_value, &task_context)?;

        Ok(Vertex::with_identifier(identifier, name, task))
    }

    fn load_task(&self, value: &Value, context: &str) -> Result<Task> {
        let object = document::object(value, context)?;
        let name = document::optional_str(object, "Name").unwrap_or("task").to_string();
        let mut task = Task::new(name);

        if let Some(inputs) = object.get("InitialInputs") {
            task.set_initial_inputs(inputs.clone());
        }
        if let Some(configuration) = object.get("Configuration") {
            task.set_configuration(configuration.clone());
        }

        if let Some(stages_value) = object.get("Stages") {
            let stages_context = format!("{context}.Stages");
            let stages = document::array(stages_value, &stages_context)?;
            for (index, stage_value) in stages.iter().enumerate() {
                let stage_context = format!("{stages_context}[{index}]");
                task.push_stage(self.load_stage(stage_value, &stage_context)?);
            }
        }

        if let Some(callback_value) = object.get("Callback") {
            let callback_context = format!("{context}.Callback");
            task.set_callback(self.load_callback(callback_value, &callback_context)?);
        }

        Ok(task)
    }

    fn load_stage(&self, value: &Value, context: &str) -> Result<Box<dyn Stage>> {
        let object = document::object(value, context)?;
        let library_name = document::required_str(object, "LibraryName", context)?;
        let symbol_name = document::required_str(object, "SymbolName", context)?;
        let label = document::optional_str(object, "Name").unwrap_or(symbol_name);

        let library = self.registry.register_library(library_name)?;
        let factory = self
            .registry
            .resolve_stage_factory(&library, library_name, symbol_name)?;
        factory.create(label)
    }

    fn load_callback(&self, value: &Value, context: &str) -> Result<TaskCallback> {
        let object = document::object(value, context)?;
        let library_name = document::required_str(object, "LibraryName", context)?;
        let symbol_name = document::required_str(object, "SymbolName", context)?;
        let kind = document::required_str(object, "Type", context)?;

        match kind {
            "Function" => {
                let library = self.registry.register_library(library_name)?;
                let handle = self
                    .registry
                    .resolve_callback_function(&library, library_name, symbol_name)?;
                Ok(TaskCallback::Function(handle.into_boxed_fn()))
            }
            "Plugin" => {
                let library = self.registry.register_library(library_name)?;
                let factory = self
                    .registry
                    .resolve_callback_plugin_factory(&library, library_name, symbol_name)?;
                Ok(TaskCallback::Plugin(factory.create()?))
            }
            other => Err(Error::wrong_type(
                format!("{context}.Type"),
                format!("'Plugin' or 'Function', found '{other}'"),
            )),
        }
    }
}

fn wrong_root_error(document: &Value) -> Error {
    Error::wrong_root(format!(
        "{} (expected a document rooted at 'DAG', e.g.:\n{SAMPLE_DOCUMENT})",
        document::describe_shape(document)
    ))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]

    use serde_json::json;

    use super::*;

    #[test]
    fn given_document_without_dag_root_when_loaded_then_wrong_root_error() {
        let registry = DynamicLibraryRegistry::new();
        let loader = DagSpecLoader::new(&registry);
        let document = json!({ "Workflow": {} });
        let result = loader.load(&document);
        assert!(matches!(result, Err(Error::WrongRoot { .. })));
    }

    #[test]
    fn given_empty_dag_document_when_loaded_then_dag_has_no_vertices() {
        let registry = DynamicLibraryRegistry::new();
        let loader = DagSpecLoader::new(&registry);
        let document = json!({ "DAG": { "Title": "empty" } });
        let dag = loader.load(&document).expect("minimal document loads");
        assert_eq!(dag.title(), "empty");
        assert_eq!(dag.vertex_count(), 0);
    }

    #[test]
    fn given_two_stageless_vertices_when_connected_then_dag_has_one_edge() {
        let registry = DynamicLibraryRegistry::new();
        let loader = DagSpecLoader::new(&registry);
        let a = "11111111-1111-1111-1111-111111111111";
        let b = "22222222-2222-2222-2222-222222222222";
        let document = json!({
            "DAG": {
                "Title": "two-nodes",
                "Vertices": [
                    { "UUID": a, "Task": { "Name": "first" } },
                    { "UUID": b, "Task": { "Name": "second" } },
                ],
                "Connections": [
                    { "From": a, "To": b },
                ],
            }
        });
        let dag = loader.load(&document).expect("well-formed document loads");
        assert_eq!(dag.vertex_count(), 2);
        assert_eq!(dag.edge_count(), 1);
    }

    #[test]
    fn given_vertex_missing_uuid_when_loaded_then_missing_key_error() {
        let registry = DynamicLibraryRegistry::new();
        let loader = DagSpecLoader::new(&registry);
        let document = json!({
            "DAG": {
                "Vertices": [ { "Task": { "Name": "first" } } ],
            }
        });
        let result = loader.load(&document);
        assert!(matches!(result, Err(Error::MissingKey { .. })));
    }

    #[test]
    fn given_connection_to_unknown_vertex_when_loaded_then_not_found_error() {
        let registry = DynamicLibraryRegistry::new();
        let loader = DagSpecLoader::new(&registry);
        let a = "11111111-1111-1111-1111-111111111111";
        let ghost = "33333333-3333-3333-3333-333333333333";
        let document = json!({
            "DAG": {
                "Vertices": [ { "UUID": a, "Task": { "Name": "first" } } ],
                "Connections": [ { "From": a, "To": ghost } ],
            }
        });
        let result = loader.load(&document);
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }

    #[test]
    fn given_cyclic_connections_when_loaded_then_would_be_cyclic_error() {
        let registry = DynamicLibraryRegistry::new();
        let loader = DagSpecLoader::new(&registry);
        let a = "11111111-1111-1111-1111-111111111111";
        let b = "22222222-2222-2222-2222-222222222222";
        let document = json!({
            "DAG": {
                "Vertices": [
                    { "UUID": a, "Task": { "Name": "first" } },
                    { "UUID": b, "Task": { "Name": "second" } },
                ],
                "Connections": [
                    { "From": a, "To": b },
                    { "From": b, "To": a },
                ],
            }
        });
        let result = loader.load(&document);
        assert!(matches!(result, Err(Error::WouldBeCyclic { .. })));
    }

    #[test]
    fn given_stage_with_unresolvable_library_when_loaded_then_library_load_failed_error() {
        let registry = DynamicLibraryRegistry::new();
        let loader = DagSpecLoader::new(&registry);
        let a = "11111111-1111-1111-1111-111111111111";
        let document = json!({
            "DAG": {
                "Vertices": [
                    {
                        "UUID": a,
                        "Task": {
                            "Name": "first",
                            "Stages": [
                                { "LibraryName": "/no/such/lib.so", "SymbolName": "make_stage" },
                            ],
                        },
                    },
                ],
            }
        });
        let result = loader.load(&document);
        assert!(matches!(result, Err(Error::LibraryLoadFailed { .. })));
    }

    #[test]
    fn given_callback_with_unknown_type_when_loaded_then_wrong_type_error() {
        let registry = DynamicLibraryRegistry::new();
        let loader = DagSpecLoader::new(&registry);
        let a = "11111111-1111-1111-1111-111111111111";
        let document = json!({
            "DAG": {
                "Vertices": [
                    {
                        "UUID": a,
                        "Task": {
                            "Name": "first",
                            "Callback": {
                                "LibraryName": "/no/such/lib.so",
                                "SymbolName": "on_done",
                                "Type": "Webhook",
                            },
                        },
                    },
                ],
            }
        });
        let result = loader.load(&document);
        assert!(matches!(result, Err(Error::WrongType { .. })));
    }
}
