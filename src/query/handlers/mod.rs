//! Clause handlers
//!
//! Every clause type is validated and interpreted by a [`ClauseHandler`]
//! looked up in a [`ClauseRegistry`]. The interpreter only dispatches; adding
//! a clause kind means registering a handler, not editing the dispatcher.

mod display;
mod grouping;
mod retainer;
mod show;
mod where_clause;

pub use display::DisplayHandler;
pub use grouping::{GroupingHandler, OrderingHandler};
pub use retainer::RetainerHandler;
pub use show::ShowHandler;
pub use where_clause::WhereHandler;

use std::collections::HashMap;
use std::sync::Arc;

use crate::columns::FieldRegistry;
use crate::query::ast::{Clause, ClauseType};
use crate::query::error::QueryResult;
use crate::query::interpreter::InterpretContext;
use crate::query::validate::ValidationResult;

/// Validates and interprets one or more clause types
pub trait ClauseHandler: Send + Sync {
    /// Handler name, for logs
    fn name(&self) -> &'static str;

    /// Clause types this handler is registered for
    fn clause_types(&self) -> &'static [ClauseType];

    fn can_handle(&self, clause: &Clause) -> bool {
        self.clause_types().contains(&clause.clause_type())
    }

    /// Record problems with a clause without failing
    fn validate(&self, clause: &Clause, result: &mut ValidationResult);

    /// Apply a clause to the query being built
    fn interpret(&self, clause: &Clause, ctx: &mut InterpretContext) -> QueryResult<()>;
}

/// Lookup table from clause type to handler
#[derive(Clone, Default)]
pub struct ClauseRegistry {
    handlers: HashMap<ClauseType, Arc<dyn ClauseHandler>>,
}

impl ClauseRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with handlers for every built-in clause
    pub fn builtin(fields: Arc<FieldRegistry>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(WhereHandler));
        registry.register(Arc::new(ShowHandler::new(fields.clone())));
        registry.register(Arc::new(DisplayHandler));
        registry.register(Arc::new(GroupingHandler::new(fields.clone())));
        registry.register(Arc::new(OrderingHandler::new(fields)));
        registry.register(Arc::new(RetainerHandler));
        registry
    }

    /// Register a handler for all of its clause types, replacing any
    /// previous handler for those types
    pub fn register(&mut self, handler: Arc<dyn ClauseHandler>) {
        for clause_type in handler.clause_types() {
            tracing::trace!(handler = handler.name(), clause = %clause_type, "Registering clause handler");
            self.handlers.insert(*clause_type, handler.clone());
        }
    }

    pub fn handler_for(&self, clause_type: ClauseType) -> Option<&Arc<dyn ClauseHandler>> {
        self.handlers.get(&clause_type)
    }

    /// Clause types with a registered handler, in parser priority order
    pub fn clause_types(&self) -> Vec<ClauseType> {
        ClauseType::ALL
            .into_iter()
            .filter(|t| self.handlers.contains_key(t))
            .collect()
    }
}

impl std::fmt::Debug for ClauseRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClauseRegistry")
            .field("clause_types", &self.clause_types())
            .finish()
    }
}
