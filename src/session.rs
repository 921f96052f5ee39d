//! One compilation pass over a workflow
//!
//! The session owns the settings and the file description cache of a pass and
//! borrows the platform client. Remote files are described up front in one
//! batch by [`CompileSession::prepare_files`]; everything after that reads the
//! cache.

use crate::block::{
    categorize, closure, inputs_used_as_outputs, output_closure, outputs, split,
    split_to_blocks, Block, Category, Closure,
};
use crate::config::CompilerConfig;
use crate::dx::{DxFile, FileInfoCache, PlatformClient};
use crate::error::WdlError;
use crate::links::{find_dx_files, gen_fields, DxLink, WdlVarLinks, WireSerializer};
use crate::tree::{Declaration, Workflow, WorkflowElement};
use crate::types::Type;
use crate::value::Value;
use indexmap::{IndexMap, IndexSet};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

/// A block together with everything code generation needs to know about it.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockPlan {
    /// Location for [`get_sub_block`](crate::block::get_sub_block)
    pub path: Vec<usize>,
    pub block: Block,
    pub category: Category,
    pub closure: Closure,
    pub outputs: IndexMap<String, Type>,
    /// Blocks of the section body, for full-block categories
    pub sub_blocks: Vec<BlockPlan>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowPlan {
    pub name: String,
    pub inputs: Vec<Declaration>,
    pub inputs_with_defaults: Vec<Declaration>,
    pub blocks: Vec<BlockPlan>,
    pub outputs: Vec<Declaration>,
    /// Names the output section reads
    pub output_closure: IndexSet<String>,
    /// Workflow inputs the output section reads directly
    pub passthrough_inputs: IndexSet<String>,
}

pub struct CompileSession<'a, C: PlatformClient + ?Sized> {
    config: CompilerConfig,
    client: &'a C,
    cache: FileInfoCache,
}

impl<'a, C: PlatformClient + ?Sized> CompileSession<'a, C> {
    pub fn new(config: CompilerConfig, client: &'a C) -> Self {
        Self {
            config,
            client,
            cache: FileInfoCache::new(),
        }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn cache(&self) -> &FileInfoCache {
        &self.cache
    }

    /// Split and classify a workflow, descending into full-block sections.
    pub fn plan(&self, workflow: &Workflow) -> Result<WorkflowPlan, WdlError> {
        let split = split(workflow);
        let blocks = self.plan_blocks(split.blocks, &[])?;
        let plan = WorkflowPlan {
            name: workflow.name.clone(),
            output_closure: output_closure(&split.outputs),
            passthrough_inputs: inputs_used_as_outputs(&workflow.inputs, &split.outputs),
            inputs: split.inputs,
            inputs_with_defaults: split.inputs_with_defaults,
            blocks,
            outputs: split.outputs,
        };
        info!(
            workflow = %plan.name,
            blocks = plan.blocks.len(),
            passthrough = plan.passthrough_inputs.len(),
            "planned workflow"
        );
        Ok(plan)
    }

    fn plan_blocks(
        &self,
        blocks: Vec<Block>,
        parent: &[usize],
    ) -> Result<Vec<BlockPlan>, WdlError> {
        let mut plans = Vec::with_capacity(blocks.len());
        for (index, block) in blocks.into_iter().enumerate() {
            let mut path = parent.to_vec();
            path.push(index);

            let category = categorize(&block)?;
            let sub_blocks = match &category {
                Category::CondFullBlock { .. } | Category::ScatterFullBlock { .. } => {
                    self.plan_blocks(split_to_blocks(category.inner_body()?), &path)?
                }
                _ => Vec::new(),
            };
            if self.config.verbose() {
                info!(?path, category = category.name(), size = block.len(), "block");
            }
            plans.push(BlockPlan {
                closure: closure(&block)?,
                outputs: outputs(&block),
                path,
                block,
                category,
                sub_blocks,
            });
        }
        Ok(plans)
    }

    /// Describe every remote file referenced by `values` and `links`.
    ///
    /// Issues at most one platform request. Files without a project are
    /// described in the configured default project.
    pub fn prepare_files(
        &mut self,
        values: &[Value],
        links: &[WdlVarLinks],
    ) -> Result<(), WdlError> {
        let mut files = IndexSet::new();
        for value in values {
            collect_value_files(value, &mut files);
        }
        for link in links {
            if let DxLink::Value(json) = &link.link {
                files.extend(find_dx_files(json));
            }
        }
        let files: Vec<DxFile> = files
            .into_iter()
            .map(|mut file| {
                if file.project.is_none() {
                    file.project = self.config.default_project.clone();
                }
                file
            })
            .collect();

        info!(files = files.len(), "preparing remote files");
        self.cache.prefetch(self.client, &files)
    }

    fn serializer(&self) -> WireSerializer<'_> {
        if self.config.check_file_states() {
            WireSerializer::with_file_checks(&self.cache)
        } else {
            WireSerializer::new()
        }
    }

    /// Inline a compile-time value, checking its files against the cache.
    pub fn import_value(&self, wdl_type: Type, value: &Value) -> Result<WdlVarLinks, WdlError> {
        WdlVarLinks::import_with(&self.serializer(), wdl_type, value)
    }

    /// Fields to pass `links` to a stage under `name`.
    pub fn stage_fields(
        &self,
        links: &WdlVarLinks,
        name: &str,
    ) -> Result<Vec<(String, JsonValue)>, WdlError> {
        if self.config.check_file_states() {
            if let DxLink::Value(json) = &links.link {
                for file in find_dx_files(json) {
                    self.cache.ensure_live(&file)?;
                }
            }
        }
        let fields = gen_fields(links, name, self.config.encode_dots())?;
        debug!(name, fields = fields.len(), "generated stage fields");
        Ok(fields)
    }

    /// Constant declarations of a workflow body, evaluated at compile time.
    pub fn constant_inputs(
        &self,
        elements: &[WorkflowElement],
    ) -> Result<IndexMap<String, WdlVarLinks>, WdlError> {
        let mut constants = IndexMap::new();
        for element in elements {
            if let WorkflowElement::Declaration(decl) = element {
                if let Some(value) = decl.expr.as_ref().and_then(|expr| expr.constant_value()) {
                    let value = value.coerce_optionals(&decl.decl_type);
                    let links = self.import_value(decl.decl_type.clone(), &value)?;
                    constants.insert(decl.name.clone(), links);
                }
            }
        }
        Ok(constants)
    }
}

fn collect_value_files(value: &Value, found: &mut IndexSet<DxFile>) {
    if let Value::File(path) = value {
        if let Some(file) = DxFile::parse_uri(path) {
            found.insert(file);
        }
    }
    for child in value.children() {
        collect_value_files(child, found);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dx::{ArchivalState, DxFileDescribe};
    use crate::error::SourcePosition;
    use crate::expr::Expression;
    use chrono::Utc;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct RecordingPlatform {
        requests: RefCell<Vec<Vec<DxFile>>>,
    }

    impl PlatformClient for RecordingPlatform {
        fn describe_files(
            &self,
            files: &[DxFile],
        ) -> Result<HashMap<String, DxFileDescribe>, WdlError> {
            self.requests.borrow_mut().push(files.to_vec());
            let now = Utc::now();
            Ok(files
                .iter()
                .map(|f| {
                    (
                        f.id.clone(),
                        DxFileDescribe {
                            project: f.project.clone().unwrap_or_default(),
                            id: f.id.clone(),
                            name: "data".to_string(),
                            size: 1,
                            created: now,
                            modified: now,
                            archival_state: ArchivalState::Live,
                        },
                    )
                })
                .collect())
        }
    }

    #[test]
    fn test_prepare_files_applies_default_project() {
        let platform = RecordingPlatform::default();
        let config = CompilerConfig {
            default_project: Some("project-D".to_string()),
            ..CompilerConfig::default()
        };
        let mut session = CompileSession::new(config, &platform);
        let values = vec![
            Value::array(vec![Value::file("dx://file-A"), Value::file("/tmp/local")]),
            Value::pair(Value::file("dx://project-P:file-B"), Value::file("dx://file-A")),
        ];
        session.prepare_files(&values, &[]).unwrap();

        let requests = platform.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0],
            vec![
                DxFile::new(Some("project-D".to_string()), "file-A"),
                DxFile::new(Some("project-P".to_string()), "file-B"),
            ]
        );
    }

    #[test]
    fn test_unprepared_file_is_rejected() {
        let platform = RecordingPlatform::default();
        let session = CompileSession::new(CompilerConfig::default(), &platform);
        let err = session
            .import_value(Type::file(), &Value::file("dx://file-A"))
            .unwrap_err();
        assert!(matches!(err, WdlError::Platform { .. }));

        let unchecked = CompileSession::new(
            CompilerConfig {
                check_file_states: Some(false),
                ..CompilerConfig::default()
            },
            &platform,
        );
        assert!(unchecked
            .import_value(Type::file(), &Value::file("dx://file-A"))
            .is_ok());
    }

    #[test]
    fn test_optional_constants_are_wrapped() {
        let platform = RecordingPlatform::default();
        let session = CompileSession::new(CompilerConfig::default(), &platform);
        let pos = SourcePosition::unknown();
        let body: Vec<WorkflowElement> = vec![
            Declaration::new(
                pos.clone(),
                Type::int().optional(),
                "retries",
                Some(Expression::int(pos.clone(), 3)),
            )
            .into(),
            Declaration::new(
                pos.clone(),
                Type::string().optional(),
                "note",
                Some(Expression::null(pos.clone())),
            )
            .into(),
        ];
        let constants = session.constant_inputs(&body).unwrap();
        assert_eq!(constants["retries"].eval().unwrap(), Value::some(Value::int(3)));
        assert_eq!(constants["note"].eval().unwrap(), Value::Null);
    }
}
