//! In-memory linear problem solved with Clarabel.
//!
//! Model objects write variable blocks, constraint blocks, bounds, objective
//! coefficients and named right-hand-side contributions through the
//! [`Problem`] trait. Nothing is handed to the solver until [`LpProblem::solve`],
//! which lowers the current state to Clarabel's conic form:
//!
//! ```text
//! minimize    q'x
//! subject to  Ax + s = b,   s ∈ K
//! ```
//!
//! - Equality rows and fixed variables go to one zero cone.
//! - `≤` rows, negated `≥` rows and finite bounds go to one non-negative cone.
//!
//! Duals are reported as the sensitivity of the objective to the row's
//! right-hand side, so a balance row's dual reads as a price.

use std::collections::BTreeMap;

use clarabel::{
    algebra::CscMatrix,
    solver::{DefaultSettingsBuilder, IPSolver, SupportedConeT},
};
use enmod_core::{ConstraintSense, Id, Problem, ProblemError, ProblemResult};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct VarBlock {
    start: usize,
    len: usize,
}

#[derive(Debug, Clone, Copy)]
struct ConBlock {
    start: usize,
    len: usize,
    sense: ConstraintSense,
}

#[derive(Debug, Clone, Default)]
struct LpSolution {
    x: Vec<f64>,
    row_duals: Vec<f64>,
    fixed_duals: BTreeMap<usize, f64>,
    objective: f64,
}

/// Where a problem row or fixing landed in the conic form.
#[derive(Debug, Clone, Copy)]
struct Lowered {
    row: usize,
    /// `+1` if the conic row equals the problem row, `-1` if negated
    sign: f64,
}

#[derive(Debug, Clone, Default)]
pub struct LpProblem {
    vars: BTreeMap<Id, VarBlock>,
    cons: BTreeMap<Id, ConBlock>,
    row_sense: Vec<ConstraintSense>,
    coeffs: BTreeMap<(usize, usize), f64>,
    rhs_terms: Vec<BTreeMap<Id, f64>>,
    lb: Vec<f64>,
    ub: Vec<f64>,
    obj: Vec<f64>,
    fixed: BTreeMap<usize, f64>,
    silent: bool,
    warm_start: bool,
    solution: Option<LpSolution>,
}

impl LpProblem {
    pub fn new() -> Self {
        Self {
            silent: true,
            ..Self::default()
        }
    }

    pub fn num_vars(&self) -> usize {
        self.lb.len()
    }

    pub fn num_rows(&self) -> usize {
        self.row_sense.len()
    }

    pub fn var_ids(&self) -> impl Iterator<Item = &Id> {
        self.vars.keys()
    }

    pub fn con_ids(&self) -> impl Iterator<Item = &Id> {
        self.cons.keys()
    }

    /// Number of periods of a variable block.
    pub fn var_len(&self, id: &Id) -> ProblemResult<usize> {
        self.vars
            .get(id)
            .map(|block| block.len)
            .ok_or_else(|| ProblemError::UnknownVariable(id.clone()))
    }

    pub fn con_sense(&self, id: &Id) -> ProblemResult<ConstraintSense> {
        self.cons
            .get(id)
            .map(|block| block.sense)
            .ok_or_else(|| ProblemError::UnknownConstraint(id.clone()))
    }

    /// Sum of the named right-hand-side contributions of a row.
    pub fn rhs(&self, con: &Id, ci: usize) -> ProblemResult<f64> {
        let row = self.row(con, ci)?;
        Ok(self.rhs_terms[row].values().sum())
    }

    pub fn is_solved(&self) -> bool {
        self.solution.is_some()
    }

    fn col(&self, var: &Id, i: usize) -> ProblemResult<usize> {
        let block = self
            .vars
            .get(var)
            .ok_or_else(|| ProblemError::UnknownVariable(var.clone()))?;
        if i >= block.len {
            return Err(ProblemError::OutOfRange {
                id: var.clone(),
                index: i,
                len: block.len,
            });
        }
        Ok(block.start + i)
    }

    fn row(&self, con: &Id, ci: usize) -> ProblemResult<usize> {
        let block = self
            .cons
            .get(con)
            .ok_or_else(|| ProblemError::UnknownConstraint(con.clone()))?;
        if ci >= block.len {
            return Err(ProblemError::OutOfRange {
                id: con.clone(),
                index: ci,
                len: block.len,
            });
        }
        Ok(block.start + ci)
    }

    fn add_con(&mut self, id: &Id, n: usize, sense: ConstraintSense) -> ProblemResult<()> {
        if self.cons.contains_key(id) {
            return Err(ProblemError::DuplicateBlock(id.clone()));
        }
        let start = self.row_sense.len();
        self.cons.insert(id.clone(), ConBlock { start, len: n, sense });
        self.row_sense.extend(std::iter::repeat(sense).take(n));
        self.rhs_terms.extend(std::iter::repeat_with(BTreeMap::new).take(n));
        Ok(())
    }

    fn solution(&self) -> ProblemResult<&LpSolution> {
        self.solution.as_ref().ok_or(ProblemError::NotSolved)
    }

    /// Solve a problem without variables: every row must hold at zero.
    fn solve_empty(&mut self) -> ProblemResult<()> {
        for (row, sense) in self.row_sense.iter().enumerate() {
            let rhs: f64 = self.rhs_terms[row].values().sum();
            let holds = match sense {
                ConstraintSense::Eq => rhs.abs() <= 1e-9,
                ConstraintSense::Le => rhs >= -1e-9,
                ConstraintSense::Ge => rhs <= 1e-9,
            };
            if !holds {
                return Err(ProblemError::Solver(format!(
                    "row {row} cannot hold without variables (rhs {rhs})"
                )));
            }
        }
        self.solution = Some(LpSolution {
            row_duals: vec![0.0; self.num_rows()],
            ..LpSolution::default()
        });
        Ok(())
    }
}

impl Problem for LpProblem {
    fn add_var(&mut self, id: &Id, n: usize) -> ProblemResult<()> {
        if self.vars.contains_key(id) {
            return Err(ProblemError::DuplicateBlock(id.clone()));
        }
        let start = self.num_vars();
        self.vars.insert(id.clone(), VarBlock { start, len: n });
        self.lb.extend(std::iter::repeat(f64::NEG_INFINITY).take(n));
        self.ub.extend(std::iter::repeat(f64::INFINITY).take(n));
        self.obj.extend(std::iter::repeat(0.0).take(n));
        Ok(())
    }

    fn add_eq(&mut self, id: &Id, n: usize) -> ProblemResult<()> {
        self.add_con(id, n, ConstraintSense::Eq)
    }

    fn add_le(&mut self, id: &Id, n: usize) -> ProblemResult<()> {
        self.add_con(id, n, ConstraintSense::Le)
    }

    fn add_ge(&mut self, id: &Id, n: usize) -> ProblemResult<()> {
        self.add_con(id, n, ConstraintSense::Ge)
    }

    fn has_var(&self, id: &Id) -> bool {
        self.vars.contains_key(id)
    }

    fn has_con(&self, id: &Id) -> bool {
        self.cons.contains_key(id)
    }

    fn set_con_coeff(
        &mut self,
        con: &Id,
        var: &Id,
        ci: usize,
        vi: usize,
        value: f64,
    ) -> ProblemResult<()> {
        let key = (self.row(con, ci)?, self.col(var, vi)?);
        if value == 0.0 {
            self.coeffs.remove(&key);
        } else {
            self.coeffs.insert(key, value);
        }
        Ok(())
    }

    fn get_con_coeff(&self, con: &Id, var: &Id, ci: usize, vi: usize) -> ProblemResult<f64> {
        let key = (self.row(con, ci)?, self.col(var, vi)?);
        Ok(self.coeffs.get(&key).copied().unwrap_or(0.0))
    }

    fn set_rhs_term(&mut self, con: &Id, term: &Id, ci: usize, value: f64) -> ProblemResult<()> {
        let row = self.row(con, ci)?;
        self.rhs_terms[row].insert(term.clone(), value);
        Ok(())
    }

    fn get_rhs_term(&self, con: &Id, term: &Id, ci: usize) -> ProblemResult<f64> {
        let row = self.row(con, ci)?;
        Ok(self.rhs_terms[row].get(term).copied().unwrap_or(0.0))
    }

    fn set_ub(&mut self, var: &Id, i: usize, value: f64) -> ProblemResult<()> {
        let col = self.col(var, i)?;
        self.ub[col] = value;
        Ok(())
    }

    fn get_ub(&self, var: &Id, i: usize) -> ProblemResult<f64> {
        Ok(self.ub[self.col(var, i)?])
    }

    fn set_lb(&mut self, var: &Id, i: usize, value: f64) -> ProblemResult<()> {
        let col = self.col(var, i)?;
        self.lb[col] = value;
        Ok(())
    }

    fn get_lb(&self, var: &Id, i: usize) -> ProblemResult<f64> {
        Ok(self.lb[self.col(var, i)?])
    }

    fn set_obj_coeff(&mut self, var: &Id, i: usize, value: f64) -> ProblemResult<()> {
        let col = self.col(var, i)?;
        self.obj[col] = value;
        Ok(())
    }

    fn get_obj_coeff(&self, var: &Id, i: usize) -> ProblemResult<f64> {
        Ok(self.obj[self.col(var, i)?])
    }

    fn fix(&mut self, var: &Id, i: usize, value: f64) -> ProblemResult<()> {
        let col = self.col(var, i)?;
        self.fixed.insert(col, value);
        Ok(())
    }

    fn unfix(&mut self, var: &Id, i: usize) -> ProblemResult<()> {
        let col = self.col(var, i)?;
        self.fixed.remove(&col);
        Ok(())
    }

    fn fixed_var_dual(&self, var: &Id, i: usize) -> ProblemResult<f64> {
        let col = self.col(var, i)?;
        let solution = self.solution()?;
        solution
            .fixed_duals
            .get(&col)
            .copied()
            .ok_or_else(|| {
                ProblemError::Solver(format!("{var}[{i}] was not fixed at the last solve"))
            })
    }

    fn solve(&mut self) -> ProblemResult<()> {
        let n_var = self.num_vars();
        if n_var == 0 {
            return self.solve_empty();
        }

        // Conic rows, zero cone first.
        let mut rows: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n_var];
        let mut rhs: Vec<f64> = Vec::new();
        let mut lowered: Vec<Option<Lowered>> = vec![None; self.num_rows()];
        let mut fixed_rows: BTreeMap<usize, usize> = BTreeMap::new();

        let mut by_row: Vec<Vec<(usize, f64)>> = vec![Vec::new(); self.num_rows()];
        for (&(row, col), &value) in &self.coeffs {
            by_row[row].push((col, value));
        }

        let push_row = |coeffs: &[(usize, f64)],
                        b: f64,
                        sign: f64,
                        rows: &mut Vec<Vec<(usize, f64)>>,
                        rhs: &mut Vec<f64>|
         -> usize {
            let row_idx = rhs.len();
            for &(col, value) in coeffs {
                rows[col].push((row_idx, sign * value));
            }
            rhs.push(sign * b);
            row_idx
        };

        for (row, sense) in self.row_sense.iter().enumerate() {
            if *sense == ConstraintSense::Eq {
                let b = self.rhs_terms[row].values().sum();
                let at = push_row(&by_row[row], b, 1.0, &mut rows, &mut rhs);
                lowered[row] = Some(Lowered { row: at, sign: 1.0 });
            }
        }
        for (&col, &value) in &self.fixed {
            let at = push_row(&[(col, 1.0)], value, 1.0, &mut rows, &mut rhs);
            fixed_rows.insert(col, at);
        }
        let n_zero = rhs.len();

        for (row, sense) in self.row_sense.iter().enumerate() {
            let sign = match sense {
                ConstraintSense::Eq => continue,
                ConstraintSense::Le => 1.0,
                ConstraintSense::Ge => -1.0,
            };
            let b = self.rhs_terms[row].values().sum();
            let at = push_row(&by_row[row], b, sign, &mut rows, &mut rhs);
            lowered[row] = Some(Lowered { row: at, sign });
        }
        for col in 0..n_var {
            if self.fixed.contains_key(&col) {
                continue;
            }
            if self.ub[col].is_finite() {
                push_row(&[(col, 1.0)], self.ub[col], 1.0, &mut rows, &mut rhs);
            }
            if self.lb[col].is_finite() {
                push_row(&[(col, 1.0)], self.lb[col], -1.0, &mut rows, &mut rhs);
            }
        }
        let n_rows = rhs.len();
        let n_nonneg = n_rows - n_zero;

        let mut cones: Vec<SupportedConeT<f64>> = Vec::new();
        if n_zero > 0 {
            cones.push(SupportedConeT::ZeroConeT(n_zero));
        }
        if n_nonneg > 0 {
            cones.push(SupportedConeT::NonnegativeConeT(n_nonneg));
        }

        let mut col_ptr = Vec::with_capacity(n_var + 1);
        let mut row_idx = Vec::new();
        let mut values = Vec::new();
        for column in rows.iter_mut() {
            col_ptr.push(row_idx.len());
            column.sort_by_key(|(r, _)| *r);
            for &(r, v) in column.iter() {
                row_idx.push(r);
                values.push(v);
            }
        }
        col_ptr.push(row_idx.len());

        let a_mat = CscMatrix::new(n_rows, n_var, col_ptr, row_idx, values);
        let p_mat = CscMatrix::new(n_var, n_var, vec![0; n_var + 1], Vec::new(), Vec::new());

        let settings = DefaultSettingsBuilder::default()
            .verbose(!self.silent)
            .build()
            .map_err(|e| ProblemError::Solver(format!("Clarabel settings error: {:?}", e)))?;

        let mut solver =
            clarabel::solver::DefaultSolver::new(&p_mat, &self.obj, &a_mat, &rhs, &cones, settings)
                .map_err(|e| {
                    ProblemError::Solver(format!("Clarabel initialization failed: {:?}", e))
                })?;

        solver.solve();

        let sol = solver.solution;
        if !matches!(
            sol.status,
            clarabel::solver::SolverStatus::Solved | clarabel::solver::SolverStatus::AlmostSolved
        ) {
            self.solution = None;
            return Err(ProblemError::Solver(format!(
                "Clarabel returned status {:?}",
                sol.status
            )));
        }

        let x = sol.x.clone();
        let z = &sol.z;
        let row_duals = lowered
            .iter()
            .map(|at| at.map_or(0.0, |at| -at.sign * z[at.row]))
            .collect();
        let fixed_duals = fixed_rows
            .iter()
            .map(|(&col, &at)| (col, -z[at]))
            .collect();
        let objective = self.obj.iter().zip(&x).map(|(c, v)| c * v).sum();
        debug!(
            vars = n_var,
            rows = n_rows,
            iterations = sol.iterations,
            objective,
            "lp solved"
        );
        self.solution = Some(LpSolution {
            x,
            row_duals,
            fixed_duals,
            objective,
        });
        Ok(())
    }

    fn var_value(&self, var: &Id, i: usize) -> ProblemResult<f64> {
        let col = self.col(var, i)?;
        Ok(self.solution()?.x[col])
    }

    fn con_dual(&self, con: &Id, i: usize) -> ProblemResult<f64> {
        let row = self.row(con, i)?;
        Ok(self.solution()?.row_duals[row])
    }

    fn objective_value(&self) -> ProblemResult<f64> {
        Ok(self.solution()?.objective)
    }

    fn warm_start(&self) -> bool {
        self.warm_start
    }

    fn set_warm_start(&mut self, enabled: bool) {
        self.warm_start = enabled;
    }

    fn set_silent(&mut self, silent: bool) {
        self.silent = silent;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(concept: &str, name: &str) -> Id {
        Id::new(concept, name)
    }

    #[test]
    fn test_block_addressing() {
        let mut lp = LpProblem::new();
        let x = id("Flow", "x");
        lp.add_var(&x, 3).unwrap();
        assert!(matches!(
            lp.add_var(&x, 1),
            Err(ProblemError::DuplicateBlock(_))
        ));
        assert!(matches!(
            lp.set_ub(&x, 3, 1.0),
            Err(ProblemError::OutOfRange { index: 3, len: 3, .. })
        ));
        assert!(matches!(
            lp.set_ub(&id("Flow", "y"), 0, 1.0),
            Err(ProblemError::UnknownVariable(_))
        ));
        assert_eq!(lp.get_lb(&x, 0).unwrap(), f64::NEG_INFINITY);
        assert_eq!(lp.get_ub(&x, 2).unwrap(), f64::INFINITY);
        assert!(matches!(lp.var_value(&x, 0), Err(ProblemError::NotSolved)));
    }

    #[test]
    fn test_rhs_terms_are_summed() {
        let mut lp = LpProblem::new();
        let b = id("Balance", "b");
        lp.add_eq(&b, 2).unwrap();
        lp.set_rhs_term(&b, &id("RHSTerm", "d1"), 0, 3.0).unwrap();
        lp.set_rhs_term(&b, &id("RHSTerm", "d2"), 0, 4.0).unwrap();
        lp.set_rhs_term(&b, &id("RHSTerm", "d1"), 0, 5.0).unwrap();
        assert_eq!(lp.rhs(&b, 0).unwrap(), 9.0);
        assert_eq!(lp.get_rhs_term(&b, &id("RHSTerm", "d2"), 0).unwrap(), 4.0);
        assert_eq!(lp.rhs(&b, 1).unwrap(), 0.0);
    }

    #[test]
    fn test_solve_dispatch() {
        // min 10 g1 + 20 g2, g1 + g2 = 150, 0 <= g1 <= 100, g2 >= 0
        let mut lp = LpProblem::new();
        let g1 = id("Flow", "g1");
        let g2 = id("Flow", "g2");
        let b = id("Balance", "b");
        lp.add_var(&g1, 1).unwrap();
        lp.add_var(&g2, 1).unwrap();
        lp.add_eq(&b, 1).unwrap();
        lp.set_con_coeff(&b, &g1, 0, 0, 1.0).unwrap();
        lp.set_con_coeff(&b, &g2, 0, 0, 1.0).unwrap();
        lp.set_rhs_term(&b, &id("RHSTerm", "load"), 0, 150.0).unwrap();
        lp.set_lb(&g1, 0, 0.0).unwrap();
        lp.set_ub(&g1, 0, 100.0).unwrap();
        lp.set_lb(&g2, 0, 0.0).unwrap();
        lp.set_obj_coeff(&g1, 0, 10.0).unwrap();
        lp.set_obj_coeff(&g2, 0, 20.0).unwrap();

        lp.solve().unwrap();
        assert!((lp.var_value(&g1, 0).unwrap() - 100.0).abs() < 1e-4);
        assert!((lp.var_value(&g2, 0).unwrap() - 50.0).abs() < 1e-4);
        assert!((lp.objective_value().unwrap() - 2000.0).abs() < 1e-3);
        // marginal unit served by g2
        assert!((lp.con_dual(&b, 0).unwrap() - 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_fixed_variable_dual() {
        // min 5 x + 0 y, x + y >= 10, x fixed to 4, y >= 0 costs 7
        let mut lp = LpProblem::new();
        let x = id("Storage", "x");
        let y = id("Flow", "y");
        let c = id("Limit", "c");
        lp.add_var(&x, 1).unwrap();
        lp.add_var(&y, 1).unwrap();
        lp.add_ge(&c, 1).unwrap();
        lp.set_con_coeff(&c, &x, 0, 0, 1.0).unwrap();
        lp.set_con_coeff(&c, &y, 0, 0, 1.0).unwrap();
        lp.set_rhs_term(&c, &id("RHSTerm", "min"), 0, 10.0).unwrap();
        lp.set_lb(&y, 0, 0.0).unwrap();
        lp.set_obj_coeff(&x, 0, 5.0).unwrap();
        lp.set_obj_coeff(&y, 0, 7.0).unwrap();
        lp.fix(&x, 0, 4.0).unwrap();

        lp.solve().unwrap();
        assert!((lp.var_value(&x, 0).unwrap() - 4.0).abs() < 1e-5);
        assert!((lp.var_value(&y, 0).unwrap() - 6.0).abs() < 1e-4);
        // one more unit of x saves one unit of y: 5 - 7
        assert!((lp.fixed_var_dual(&x, 0).unwrap() + 2.0).abs() < 1e-4);
        assert!((lp.con_dual(&c, 0).unwrap() - 7.0).abs() < 1e-4);

        lp.unfix(&x, 0).unwrap();
        lp.set_lb(&x, 0, 0.0).unwrap();
        lp.solve().unwrap();
        assert!((lp.var_value(&x, 0).unwrap() - 10.0).abs() < 1e-4);
        assert!(lp.fixed_var_dual(&x, 0).is_err());
    }

    #[test]
    fn test_infeasible_reports_solver_error() {
        let mut lp = LpProblem::new();
        let x = id("Flow", "x");
        let b = id("Balance", "b");
        lp.add_var(&x, 1).unwrap();
        lp.add_eq(&b, 1).unwrap();
        lp.set_con_coeff(&b, &x, 0, 0, 1.0).unwrap();
        lp.set_rhs_term(&b, &id("RHSTerm", "d"), 0, 10.0).unwrap();
        lp.set_lb(&x, 0, 0.0).unwrap();
        lp.set_ub(&x, 0, 5.0).unwrap();
        assert!(matches!(lp.solve(), Err(ProblemError::Solver(_))));
        assert!(!lp.is_solved());
    }

    #[test]
    fn test_zero_coefficient_removes_entry() {
        let mut lp = LpProblem::new();
        let x = id("Flow", "x");
        let b = id("Balance", "b");
        lp.add_var(&x, 1).unwrap();
        lp.add_eq(&b, 1).unwrap();
        lp.set_con_coeff(&b, &x, 0, 0, 2.0).unwrap();
        lp.set_con_coeff(&b, &x, 0, 0, 0.0).unwrap();
        assert_eq!(lp.get_con_coeff(&b, &x, 0, 0).unwrap(), 0.0);
        assert!(lp.coeffs.is_empty());
    }
}
