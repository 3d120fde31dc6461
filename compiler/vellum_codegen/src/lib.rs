//! Vellum Codegen - compiles template trees into suspendable render
//! procedures.
//!
//! # Architecture
//!
//! ```text
//!   TemplateFile ──► UnitCompiler ──► CompiledUnit ──► TemplateRegistry
//!                        │                 │
//!                        ▼                 ▼
//!                   assemble()       CompiledTemplate: Renderable
//!                   ├── LocalVariableManager   slots and scopes
//!                   ├── ExprCompiler           instance / constant exprs
//!                   ├── StmtCompiler           ops + resume points
//!                   └── metadata               TemplateMetadata
//! ```
//!
//! - `scope`: slot allocation and live-set computation
//! - `expr`: expression lowering, constant folding, evaluation
//! - `stmt`: node lowering into a flat op list with resume points
//! - `procedure`: the op list, the resume table, and the executor
//! - `dispatch`: call sites that bind directly within a unit or fall back
//!   to the render context
//! - `unit` / `registry`: grouping compiled templates and serving them
//!
//! Rendering never blocks: when the sink is not ready or a lazy value is
//! pending, the procedure saves its live slots and returns. The caller
//! resumes later with the returned state.

mod dispatch;
mod error;
mod expr;
mod metadata;
mod options;
mod procedure;
mod registry;
mod scope;
mod stmt;
mod template;
mod unit;

use std::sync::Once;

pub use dispatch::{BindingKind, TemplateSite, VeSite};
pub use error::CompileError;
pub use expr::{ExprCompiler, ExprMode, ValueProcedure};
pub use options::CompileOptions;
pub use procedure::Procedure;
pub use registry::TemplateRegistry;
pub use scope::{LocalVariableManager, ScopeId, Slot, SlotInfo, SlotKind};
pub use stmt::{CompiledBody, StmtCompiler};
pub use template::CompiledTemplate;
pub use unit::{CompiledUnit, UnitCompiler, VeMetadataTable};

static TRACING_INIT: Once = Once::new();

/// Installs a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Does nothing unless `RUST_LOG` is set, and only the first call has any
/// effect.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
