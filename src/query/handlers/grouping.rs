//! GROUP BY / HAVING and ORDER BY / LIMIT handlers

use std::sync::Arc;

use crate::columns::FieldRegistry;
use crate::query::ast::{Clause, ClauseType, Expr, Identifier, LiteralValue};
use crate::query::error::{QueryError, QueryResult};
use crate::query::interpreter::{HavingCondition, InterpretContext, OrderItemSpec};
use crate::query::validate::ValidationResult;

use super::ClauseHandler;

/// Handles GROUP BY and HAVING
pub struct GroupingHandler {
    fields: Arc<FieldRegistry>,
}

impl GroupingHandler {
    pub fn new(fields: Arc<FieldRegistry>) -> Self {
        Self { fields }
    }

    fn having_conditions(&self, condition: &Expr) -> QueryResult<Vec<HavingCondition>> {
        condition
            .conjuncts()
            .into_iter()
            .map(|expr| {
                let Expr::Binary(binary) = expr else {
                    return Err(QueryError::InvalidCondition(format!(
                        "expected a comparison at {}",
                        expr.position()
                    )));
                };

                let (field, aggregation) = match binary.left.as_ref() {
                    Expr::Identifier(id) => (self.fields.normalize(&id.name), None),
                    Expr::Function(call) => {
                        (self.fields.normalize(&call.argument.name), Some(call.function))
                    }
                    other => {
                        return Err(QueryError::InvalidCondition(format!(
                            "expected a field or aggregation at {}",
                            other.position()
                        )))
                    }
                };

                let operator = binary.operator.comparison().ok_or_else(|| {
                    QueryError::InvalidCondition(format!(
                        "HAVING supports comparison operators only, not {}",
                        binary.operator
                    ))
                })?;

                let value = match binary.right.as_ref() {
                    Expr::Literal(literal) => match literal.value {
                        LiteralValue::Number(n) => n,
                        LiteralValue::Percentage(p) => p / 100.0,
                        _ => {
                            return Err(QueryError::InvalidCondition(format!(
                                "HAVING {} needs a numeric value, found {}",
                                field, literal
                            )))
                        }
                    },
                    other => {
                        return Err(QueryError::InvalidCondition(format!(
                            "HAVING {} needs a single value at {}",
                            field,
                            other.position()
                        )))
                    }
                };

                Ok(HavingCondition {
                    field,
                    aggregation,
                    operator,
                    value,
                })
            })
            .collect()
    }
}

impl ClauseHandler for GroupingHandler {
    fn name(&self) -> &'static str {
        "grouping"
    }

    fn clause_types(&self) -> &'static [ClauseType] {
        &[ClauseType::GroupBy, ClauseType::Having]
    }

    fn validate(&self, clause: &Clause, result: &mut ValidationResult) {
        match clause {
            Clause::GroupBy(group) => {
                for field in &group.fields {
                    warn_unknown(&self.fields, field, "GROUP BY", result);
                }
            }
            Clause::Having(having) => {
                for expr in having.condition.conjuncts() {
                    let Expr::Binary(binary) = expr else {
                        continue;
                    };
                    if binary.operator.comparison().is_none() {
                        result.error(format!(
                            "{}: HAVING supports comparison operators only, not {}",
                            binary.position, binary.operator
                        ));
                    }
                    if let Expr::Literal(literal) = binary.right.as_ref() {
                        if !matches!(
                            literal.value,
                            LiteralValue::Number(_) | LiteralValue::Percentage(_)
                        ) {
                            result.error(format!(
                                "{}: HAVING needs a numeric value, found {}",
                                literal.position, literal
                            ));
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn interpret(&self, clause: &Clause, ctx: &mut InterpretContext) -> QueryResult<()> {
        match clause {
            Clause::GroupBy(group) => {
                let fields = group
                    .fields
                    .iter()
                    .map(|f| self.fields.normalize(&f.name))
                    .collect();
                ctx.builder().group_by(fields);
            }
            Clause::Having(having) => {
                let conditions = self.having_conditions(&having.condition)?;
                ctx.builder().having(conditions);
            }
            other => return Err(QueryError::UnknownClause(other.clause_type())),
        }
        Ok(())
    }
}

/// Handles ORDER BY and LIMIT
pub struct OrderingHandler {
    fields: Arc<FieldRegistry>,
}

impl OrderingHandler {
    pub fn new(fields: Arc<FieldRegistry>) -> Self {
        Self { fields }
    }
}

impl ClauseHandler for OrderingHandler {
    fn name(&self) -> &'static str {
        "ordering"
    }

    fn clause_types(&self) -> &'static [ClauseType] {
        &[ClauseType::OrderBy, ClauseType::Limit]
    }

    fn validate(&self, clause: &Clause, result: &mut ValidationResult) {
        match clause {
            Clause::OrderBy(order) => {
                for item in &order.items {
                    warn_unknown(&self.fields, &item.field, "ORDER BY", result);
                }
            }
            Clause::Limit(limit) => {
                if let Err(e) = row_limit(limit.count.value.clone()) {
                    result.error(format!("{}: {}", limit.count.position, e));
                }
            }
            _ => {}
        }
    }

    fn interpret(&self, clause: &Clause, ctx: &mut InterpretContext) -> QueryResult<()> {
        match clause {
            Clause::OrderBy(order) => {
                let items = order
                    .items
                    .iter()
                    .map(|item| OrderItemSpec {
                        field: self.fields.normalize(&item.field.name),
                        direction: item.direction,
                    })
                    .collect();
                ctx.builder().order_by(items);
            }
            Clause::Limit(limit) => {
                let count = row_limit(limit.count.value.clone())
                    .map_err(|e| QueryError::InvalidValue(e.to_string()))?;
                ctx.builder().limit(count);
            }
            other => return Err(QueryError::UnknownClause(other.clause_type())),
        }
        Ok(())
    }
}

fn warn_unknown(fields: &FieldRegistry, field: &Identifier, clause: &str, result: &mut ValidationResult) {
    if fields.resolve(&field.name).is_none() {
        result.warning(format!(
            "{}: unknown field '{}' in {}",
            field.position, field.name, clause
        ));
    }
}

/// LIMIT must be a positive whole number
fn row_limit(value: LiteralValue) -> Result<usize, &'static str> {
    match value {
        LiteralValue::Number(n) if n.fract() == 0.0 && n >= 1.0 && n <= usize::MAX as f64 => {
            Ok(n as usize)
        }
        _ => Err("LIMIT must be a positive whole number"),
    }
}
