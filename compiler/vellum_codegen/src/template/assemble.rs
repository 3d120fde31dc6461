//! Render procedure assembly for one template.

use std::sync::{Arc, Weak};

use tracing::{debug, instrument};
use vellum_ir::{ContentKind, Expr, Template, TemplateFile, TemplateMetadata, Visibility};
use vellum_runtime::Value;

use super::CompiledTemplate;
use crate::dispatch::TemplateSite;
use crate::expr::{ExprCompiler, ExprMode};
use crate::metadata;
use crate::procedure::{ParamBinding, ParamSource, Procedure, StateBinding};
use crate::scope::{LocalVariableManager, SlotKind};
use crate::stmt::StmtCompiler;
use crate::unit::UnitLinks;
use crate::{CompileError, CompileOptions};

/// A compiled template not yet linked to its unit.
pub(crate) struct AssembledTemplate {
    name: Arc<str>,
    visibility: Visibility,
    content_kind: ContentKind,
    procedure: Procedure,
    call_sites: Vec<Arc<TemplateSite>>,
    metadata: TemplateMetadata,
}

impl AssembledTemplate {
    pub(crate) fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub(crate) fn link(self, unit: Weak<UnitLinks>) -> (CompiledTemplate, TemplateMetadata) {
        let template = CompiledTemplate {
            name: self.name,
            visibility: self.visibility,
            content_kind: self.content_kind,
            procedure: self.procedure,
            call_sites: self.call_sites,
            unit,
        };
        (template, self.metadata)
    }
}

/// Compiles the header and body of `template`, declared in `file`.
///
/// Parameters are declared in order, so a default may not refer to a
/// later parameter; defaults and state initializers must be constant.
#[instrument(level = "debug", skip_all, fields(template = %template.name))]
pub(crate) fn assemble(
    file: &TemplateFile,
    template: &Template,
    options: &CompileOptions,
) -> Result<AssembledTemplate, CompileError> {
    let mut vars = LocalVariableManager::new(template.name.as_str());
    let header = vars.enter_scope();

    let mut params = Vec::with_capacity(template.params.len());
    for param in &template.params {
        let default = param
            .default
            .as_ref()
            .map(|expr| constant(&vars, expr, &param.name))
            .transpose()?;
        let (kind, source) = if param.injected {
            (SlotKind::Injected, ParamSource::Injected)
        } else {
            (SlotKind::Param, ParamSource::Params)
        };
        let slot = vars.declare(&param.name, param.ty.clone(), kind)?;
        params.push(ParamBinding {
            slot,
            name: Arc::from(param.name.as_str()),
            source,
            default,
        });
    }

    let mut state = Vec::with_capacity(template.state_vars.len());
    for var in &template.state_vars {
        let value = constant(&vars, &var.initial_value, &var.name)?;
        let slot = vars.declare(&var.name, var.ty.clone(), SlotKind::State)?;
        state.push(StateBinding { slot, value });
    }

    let mut stmts = StmtCompiler::new(vars, options);
    stmts.compile_body(&template.body)?;
    let compiled = stmts.finish(header)?;
    let procedure = compiled.body.into_procedure(params, state);

    debug!(
        ops = procedure.op_count(),
        resume_points = procedure.resume_point_count(),
        slots = procedure.slot_count(),
        "assembled render procedure"
    );

    Ok(AssembledTemplate {
        name: Arc::from(template.name.as_str()),
        visibility: template.visibility,
        content_kind: ContentKind::from(template.content_kind),
        procedure,
        call_sites: compiled.call_sites,
        metadata: metadata::collect(file, template),
    })
}

fn constant(vars: &LocalVariableManager, expr: &Expr, owner: &str) -> Result<Value, CompileError> {
    ExprCompiler::new(vars)
        .compile(expr, ExprMode::Constant { owner })?
        .into_constant()
        .ok_or_else(|| CompileError::internal(vars.template(), "constant did not fold"))
}
