//! Solver-agnostic MILP model representation.
//!
//! Formulations build a [`MilpModel`] out of integer variables and linear
//! constraints; a [`backend::MilpBackend`] turns the model into a concrete
//! solver instance. Keeping the model abstract lets the same formulation run
//! on any engine that implements the backend trait.

pub mod backend;
#[cfg(feature = "solver-highs")]
pub mod highs;

/// Handle to a decision variable inside one [`MilpModel`].
///
/// Ids index the model's variable list in creation order; backends rely on
/// this when mapping variables onto solver columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(pub(crate) usize);

impl VarId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Comparison operator of a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    Le,
    Eq,
    Ge,
}

/// Direction of the objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveSense {
    Minimize,
    Maximize,
}

/// A sparse linear expression: a sum of `coeff * var` terms plus a constant.
#[derive(Debug, Clone, Default)]
pub struct LinExpr {
    pub terms: Vec<(VarId, f64)>,
    pub constant: f64,
}

impl LinExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// Append `coeff * var`. Zero coefficients are dropped.
    pub fn add_term(&mut self, var: VarId, coeff: f64) {
        if coeff != 0.0 {
            self.terms.push((var, coeff));
        }
    }

    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Evaluate the expression against a full vector of variable values.
    pub fn eval(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, coeff)| coeff * values[var.0])
            .sum::<f64>()
            + self.constant
    }
}

/// Definition of one decision variable.
#[derive(Debug, Clone)]
pub struct VarDef {
    pub name: String,
    pub lb: f64,
    pub ub: Option<f64>,
    pub is_integer: bool,
}

/// One linear constraint `expr op rhs`.
#[derive(Debug, Clone)]
pub struct MilpConstraint {
    pub name: String,
    pub expr: LinExpr,
    pub op: ConstraintOp,
    pub rhs: f64,
}

/// An abstract mixed-integer linear program.
#[derive(Debug, Clone)]
pub struct MilpModel {
    name: String,
    vars: Vec<VarDef>,
    constraints: Vec<MilpConstraint>,
    objective: LinExpr,
    sense: ObjectiveSense,
}

impl MilpModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vars: Vec::new(),
            constraints: Vec::new(),
            objective: LinExpr::new(),
            sense: ObjectiveSense::Minimize,
        }
    }

    /// Add a non-negative integer variable with an optional upper bound.
    pub fn add_integer_var(
        &mut self,
        lb: u64,
        ub: Option<u64>,
        name: impl Into<String>,
    ) -> VarId {
        let id = VarId(self.vars.len());
        self.vars.push(VarDef {
            name: name.into(),
            lb: lb as f64,
            ub: ub.map(|u| u as f64),
            is_integer: true,
        });
        id
    }

    pub fn add_constraint(
        &mut self,
        expr: LinExpr,
        op: ConstraintOp,
        rhs: f64,
        name: impl Into<String>,
    ) {
        self.constraints.push(MilpConstraint {
            name: name.into(),
            expr,
            op,
            rhs,
        });
    }

    pub fn set_objective(&mut self, expr: LinExpr, sense: ObjectiveSense) {
        self.objective = expr;
        self.sense = sense;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn vars(&self) -> &[VarDef] {
        &self.vars
    }

    pub fn constraints(&self) -> &[MilpConstraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &LinExpr {
        &self.objective
    }

    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    pub fn has_integer_vars(&self) -> bool {
        self.vars.iter().any(|v| v.is_integer)
    }

    /// The LP relaxation of this model: identical except that integrality is
    /// dropped on every variable. Used to tell apart an infeasible LP from a
    /// model that only lacks an integer solution.
    pub fn relaxed(&self) -> MilpModel {
        let mut relaxed = self.clone();
        relaxed.name = format!("{}-relaxed", self.name);
        for var in &mut relaxed.vars {
            var.is_integer = false;
        }
        relaxed
    }
}
