use z3::ast::{Ast, Bool, Real};
use z3::{Context, Solver};

use crate::geometry::{Line, Point, Polygon};
use crate::rational::Rational;

use super::vars::DecisionVariables;
use super::{
    int_to_real, rational_to_real, INTERSECTION_REPULSION_MAX, INTERSECTION_REPULSION_MIN,
    TEMPORAL_ABSENCE_THRESHOLD, TEMPORAL_PRESENCE_THRESHOLD,
};

/// Constraint flavour.
///
/// Plain constraints always bind. Sequential constraints are vacuous unless
/// the first object of the scenario prints before the second. Consequential
/// constraints are additionally vacuous while either object is marked as not
/// present (negative ordering value).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintMode {
    Plain,
    Sequential,
    Consequential,
}

/// Placement of one object during constraint emission: either still free
/// (decision variables) or already fixed to extracted rational values.
#[derive(Clone)]
pub enum Pose<'a, 'ctx> {
    Free {
        x: &'a Real<'ctx>,
        y: &'a Real<'ctx>,
        t: &'a Real<'ctx>,
    },
    Fixed {
        x: Rational,
        y: Rational,
        t: Rational,
    },
}

impl<'a, 'ctx> Pose<'a, 'ctx> {
    pub fn free(variables: &'a DecisionVariables<'ctx>, index: usize) -> Self {
        Pose::Free {
            x: &variables.x[index],
            y: &variables.y[index],
            t: &variables.t[index],
        }
    }

    pub fn fixed(x: Rational, y: Rational, t: Rational) -> Self {
        Pose::Fixed { x, y, t }
    }

    fn x_real(&self, ctx: &'ctx Context) -> Real<'ctx> {
        match self {
            Pose::Free { x, .. } => (*x).clone(),
            Pose::Fixed { x, .. } => rational_to_real(ctx, x),
        }
    }

    fn y_real(&self, ctx: &'ctx Context) -> Real<'ctx> {
        match self {
            Pose::Free { y, .. } => (*y).clone(),
            Pose::Fixed { y, .. } => rational_to_real(ctx, y),
        }
    }

    fn t_real(&self, ctx: &'ctx Context) -> Real<'ctx> {
        match self {
            Pose::Free { t, .. } => (*t).clone(),
            Pose::Fixed { t, .. } => rational_to_real(ctx, t),
        }
    }
}

/// Emits the constraint families over one solver.
///
/// The fresh line-parameter counter lives here so that every group gets its
/// own names; the witnesses have to survive across refinement rounds within
/// one solve.
pub struct ConstraintBuilder<'s, 'ctx> {
    ctx: &'ctx Context,
    solver: &'s Solver<'ctx>,
    line_variable_counter: u32,
}

impl<'s, 'ctx> ConstraintBuilder<'s, 'ctx> {
    pub fn new(ctx: &'ctx Context, solver: &'s Solver<'ctx>) -> Self {
        Self {
            ctx,
            solver,
            line_variable_counter: 0,
        }
    }

    pub fn line_variable_counter(&self) -> u32 {
        self.line_variable_counter
    }

    fn assert_any(&self, literals: Vec<Bool<'ctx>>) {
        if literals.is_empty() {
            return;
        }
        let refs: Vec<&Bool<'ctx>> = literals.iter().collect();
        self.solver.assert(&Bool::or(self.ctx, &refs));
    }

    // ---------- bed bounding ----------

    fn bed_bounding_literals(
        &self,
        x: &Real<'ctx>,
        y: &Real<'ctx>,
        polygon: &Polygon,
        box_min_x: i64,
        box_min_y: i64,
        box_max_x: i64,
        box_max_y: i64,
    ) -> Vec<Bool<'ctx>> {
        let bb = polygon.bounding_box();
        vec![
            Real::add(self.ctx, &[x, &int_to_real(self.ctx, bb.min.x)])
                .ge(&int_to_real(self.ctx, box_min_x)),
            Real::add(self.ctx, &[x, &int_to_real(self.ctx, bb.max.x)])
                .le(&int_to_real(self.ctx, box_max_x)),
            Real::add(self.ctx, &[y, &int_to_real(self.ctx, bb.min.y)])
                .ge(&int_to_real(self.ctx, box_min_y)),
            Real::add(self.ctx, &[y, &int_to_real(self.ctx, bb.max.y)])
                .le(&int_to_real(self.ctx, box_max_y)),
        ]
    }

    /// Hard form: the object's bounding box stays inside the given plate box.
    pub fn introduce_bed_bounding_box(
        &self,
        x: &Real<'ctx>,
        y: &Real<'ctx>,
        polygon: &Polygon,
        box_min_x: i64,
        box_min_y: i64,
        box_max_x: i64,
        box_max_y: i64,
    ) {
        for literal in
            self.bed_bounding_literals(x, y, polygon, box_min_x, box_min_y, box_max_x, box_max_y)
        {
            self.solver.assert(&literal);
        }
    }

    /// Retractable form used by the bounding-box optimiser: the same bounds
    /// as assumptions, so the plate extents can vary without rebuilding the
    /// formula.
    pub fn assume_bed_bounding_box(
        &self,
        x: &Real<'ctx>,
        y: &Real<'ctx>,
        polygon: &Polygon,
        box_min_x: i64,
        box_min_y: i64,
        box_max_x: i64,
        box_max_y: i64,
        assumptions: &mut Vec<Bool<'ctx>>,
    ) {
        assumptions.extend(self.bed_bounding_literals(
            x, y, polygon, box_min_x, box_min_y, box_max_x, box_max_y,
        ));
    }

    // ---------- temporal ordering ----------

    fn presence_literals(
        &self,
        mode: ConstraintMode,
        poses: &[&Pose<'_, 'ctx>],
    ) -> Vec<Bool<'ctx>> {
        if mode != ConstraintMode::Consequential {
            return Vec::new();
        }
        let zero = int_to_real(self.ctx, 0);
        poses
            .iter()
            .map(|pose| pose.t_real(self.ctx).lt(&zero))
            .collect()
    }

    /// `|T_i - T_j| > spread` for every pair of participating objects.
    pub fn introduce_temporal_ordering(
        &self,
        mode: ConstraintMode,
        variables: &DecisionVariables<'ctx>,
        participants: &[usize],
        temporal_spread: i64,
    ) {
        let spread = int_to_real(self.ctx, temporal_spread);
        for (k, &i) in participants.iter().enumerate() {
            for &j in &participants[k + 1..] {
                let t_i = &variables.t[i];
                let t_j = &variables.t[j];
                let far_after = t_i.gt(&Real::add(self.ctx, &[t_j, &spread]));
                let far_before = Real::add(self.ctx, &[t_i, &spread]).lt(t_j);
                let mut literals = self.presence_literals(
                    mode,
                    &[&Pose::free(variables, i), &Pose::free(variables, j)],
                );
                literals.push(far_after);
                literals.push(far_before);
                self.assert_any(literals);
            }
        }
    }

    /// Temporal separation of every participant against every already fixed
    /// object, whose ordering value is a numeric constant by now.
    pub fn introduce_temporal_ordering_against_fixed(
        &self,
        mode: ConstraintMode,
        variables: &DecisionVariables<'ctx>,
        values_t: &[Rational],
        fixed: &[usize],
        participants: &[usize],
        temporal_spread: i64,
    ) {
        let spread = int_to_real(self.ctx, temporal_spread);
        for &u in participants {
            for &f in fixed {
                let t_u = &variables.t[u];
                let t_f = rational_to_real(self.ctx, &values_t[f]);
                let far_after = t_u.gt(&Real::add(self.ctx, &[&t_f, &spread]));
                let far_before = Real::add(self.ctx, &[t_u, &spread]).lt(&t_f);
                let mut literals =
                    self.presence_literals(mode, &[&Pose::free(variables, u)]);
                literals.push(far_after);
                literals.push(far_before);
                self.assert_any(literals);
            }
        }
    }

    /// Presence split used by consequential attempts: present objects are
    /// pinned above the presence threshold, missing ones below the absence
    /// threshold. Assumptions, not hard clauses, so one formula serves every
    /// split of the group.
    pub fn assume_object_presence(
        &self,
        variables: &DecisionVariables<'ctx>,
        present: &[usize],
        missing: &[usize],
        assumptions: &mut Vec<Bool<'ctx>>,
    ) {
        let presence = int_to_real(self.ctx, TEMPORAL_PRESENCE_THRESHOLD);
        let absence = int_to_real(self.ctx, TEMPORAL_ABSENCE_THRESHOLD);
        for &i in present {
            assumptions.push(variables.t[i].gt(&presence));
        }
        for &i in missing {
            assumptions.push(variables.t[i].lt(&absence));
        }
    }

    /// Lepox band: the glued successor prints right after its predecessor,
    /// within `slack` spreads. Disabled by default in the configuration.
    pub fn introduce_consequential_temporal_lepox(
        &self,
        predecessor: &Pose<'_, 'ctx>,
        current: &Pose<'_, 'ctx>,
        temporal_spread: i64,
        slack: f64,
    ) {
        let t_pred = predecessor.t_real(self.ctx);
        let t_curr = current.t_real(self.ctx);
        let spread = int_to_real(self.ctx, temporal_spread);
        let band = rational_to_real(
            self.ctx,
            &Rational::new((slack * temporal_spread as f64 * 1000.0) as i64, 1000),
        );
        self.solver
            .assert(&Real::add(self.ctx, &[&t_pred, &spread]).lt(&t_curr));
        self.solver
            .assert(&t_curr.lt(&Real::add(self.ctx, &[&t_pred, &band])));
    }

    // ---------- point / polygon separation ----------

    /// Literals that make a separation clause vacuous: in sequential mode
    /// when the roles are reversed (the "later" object actually prints
    /// first), in consequential mode additionally when either object is not
    /// present.
    fn separation_guards(
        &self,
        mode: ConstraintMode,
        earlier: &Pose<'_, 'ctx>,
        later: &Pose<'_, 'ctx>,
    ) -> Vec<Bool<'ctx>> {
        match mode {
            ConstraintMode::Plain => Vec::new(),
            ConstraintMode::Sequential => {
                vec![later.t_real(self.ctx).lt(&earlier.t_real(self.ctx))]
            }
            ConstraintMode::Consequential => {
                let mut literals = self.presence_literals(mode, &[earlier, later]);
                literals.push(later.t_real(self.ctx).lt(&earlier.t_real(self.ctx)));
                literals
            }
        }
    }

    /// One literal per polygon edge: the translated point lies in the
    /// exterior half-plane of that edge.
    fn point_outside_polygon_literals(
        &self,
        point_owner: &Pose<'_, 'ctx>,
        point: Point,
        polygon_owner: &Pose<'_, 'ctx>,
        polygon: &Polygon,
    ) -> Vec<Bool<'ctx>> {
        let zero = int_to_real(self.ctx, 0);
        let dx = Real::sub(
            self.ctx,
            &[&point_owner.x_real(self.ctx), &polygon_owner.x_real(self.ctx)],
        );
        let dy = Real::sub(
            self.ctx,
            &[&point_owner.y_real(self.ctx), &polygon_owner.y_real(self.ctx)],
        );

        let mut literals = Vec::new();
        for edge in polygon.lines() {
            if edge.is_degenerate() {
                continue;
            }
            let (nx, ny) = edge.outward_normal();
            let off_x = Real::add(
                self.ctx,
                &[&dx, &int_to_real(self.ctx, point.x - edge.a.x)],
            );
            let off_y = Real::add(
                self.ctx,
                &[&dy, &int_to_real(self.ctx, point.y - edge.a.y)],
            );
            let lhs = Real::add(
                self.ctx,
                &[
                    &Real::mul(self.ctx, &[&int_to_real(self.ctx, nx), &off_x]),
                    &Real::mul(self.ctx, &[&int_to_real(self.ctx, ny), &off_y]),
                ],
            );
            literals.push(lhs.gt(&zero));
        }
        literals
    }

    fn assert_point_outside_polygon(
        &self,
        mode: ConstraintMode,
        earlier: &Pose<'_, 'ctx>,
        later: &Pose<'_, 'ctx>,
        point_owner: &Pose<'_, 'ctx>,
        point: Point,
        polygon_owner: &Pose<'_, 'ctx>,
        polygon: &Polygon,
    ) {
        if polygon.points.len() < 3 {
            return;
        }
        let mut literals = self.separation_guards(mode, earlier, later);
        literals.extend(self.point_outside_polygon_literals(
            point_owner,
            point,
            polygon_owner,
            polygon,
        ));
        self.assert_any(literals);
    }

    /// Full separation of the earlier object's footprint from one set of the
    /// later object's unreachable zones: footprint vertices outside every
    /// zone, zone vertices outside the footprint.
    pub fn introduce_polygon_outside_polygon(
        &self,
        mode: ConstraintMode,
        earlier: &Pose<'_, 'ctx>,
        earlier_footprint: &Polygon,
        later: &Pose<'_, 'ctx>,
        later_zones: &[Polygon],
    ) {
        for zone in later_zones {
            for &vertex in &earlier_footprint.points {
                self.assert_point_outside_polygon(
                    mode, earlier, later, earlier, vertex, later, zone,
                );
            }
            for &vertex in &zone.points {
                self.assert_point_outside_polygon(
                    mode,
                    earlier,
                    later,
                    later,
                    vertex,
                    earlier,
                    earlier_footprint,
                );
            }
        }
    }

    /// Size-gated variant: per zone only the vertex direction whose polygon
    /// is smaller is emitted, which together with refinement is sufficient
    /// for separation and roughly halves the clause count.
    pub fn introduce_polygon_external_polygon(
        &self,
        mode: ConstraintMode,
        earlier: &Pose<'_, 'ctx>,
        earlier_footprint: &Polygon,
        later: &Pose<'_, 'ctx>,
        later_zones: &[Polygon],
    ) {
        for zone in later_zones {
            if zone.area() > earlier_footprint.area() {
                for &vertex in &earlier_footprint.points {
                    self.assert_point_outside_polygon(
                        mode, earlier, later, earlier, vertex, later, zone,
                    );
                }
            } else {
                for &vertex in &zone.points {
                    self.assert_point_outside_polygon(
                        mode,
                        earlier,
                        later,
                        later,
                        vertex,
                        earlier,
                        earlier_footprint,
                    );
                }
            }
        }
    }

    // ---------- line non-intersection ----------

    /// Introduces two fresh line parameters tied to the intersection point of
    /// the carrier lines and repels both parameters out of the unit band
    /// unless a guard holds. Degenerate requests (zero-length edge, parallel
    /// carriers) emit nothing; refinement will come back for them only if a
    /// concrete violation materialises.
    pub fn introduce_line_non_intersection(
        &mut self,
        mode: ConstraintMode,
        earlier: &Pose<'_, 'ctx>,
        earlier_line: &Line,
        later: &Pose<'_, 'ctx>,
        later_line: &Line,
    ) {
        let (ux, uy) = earlier_line.direction();
        let (vx, vy) = later_line.direction();
        if (ux == 0 && uy == 0) || (vx == 0 && vy == 0) {
            return;
        }
        let det = ux as i128 * vy as i128 - uy as i128 * vx as i128;
        if det == 0 {
            return;
        }

        let k = self.line_variable_counter;
        self.line_variable_counter += 2;
        let t1 = Real::new_const(self.ctx, format!("t_line1-{k}"));
        let t2 = Real::new_const(self.ctx, format!("t_line2-{k}"));

        let lhs_x = Real::add(
            self.ctx,
            &[
                &earlier.x_real(self.ctx),
                &int_to_real(self.ctx, earlier_line.a.x),
                &Real::mul(self.ctx, &[&int_to_real(self.ctx, ux), &t1]),
            ],
        );
        let rhs_x = Real::add(
            self.ctx,
            &[
                &later.x_real(self.ctx),
                &int_to_real(self.ctx, later_line.a.x),
                &Real::mul(self.ctx, &[&int_to_real(self.ctx, vx), &t2]),
            ],
        );
        self.solver.assert(&lhs_x._eq(&rhs_x));

        let lhs_y = Real::add(
            self.ctx,
            &[
                &earlier.y_real(self.ctx),
                &int_to_real(self.ctx, earlier_line.a.y),
                &Real::mul(self.ctx, &[&int_to_real(self.ctx, uy), &t1]),
            ],
        );
        let rhs_y = Real::add(
            self.ctx,
            &[
                &later.y_real(self.ctx),
                &int_to_real(self.ctx, later_line.a.y),
                &Real::mul(self.ctx, &[&int_to_real(self.ctx, vy), &t2]),
            ],
        );
        self.solver.assert(&lhs_y._eq(&rhs_y));

        let repulsion_min = Real::from_real(
            self.ctx,
            INTERSECTION_REPULSION_MIN.0,
            INTERSECTION_REPULSION_MIN.1,
        );
        let repulsion_max = Real::from_real(
            self.ctx,
            INTERSECTION_REPULSION_MAX.0,
            INTERSECTION_REPULSION_MAX.1,
        );
        let mut literals = self.separation_guards(mode, earlier, later);
        literals.push(t1.lt(&repulsion_min));
        literals.push(t1.gt(&repulsion_max));
        literals.push(t2.lt(&repulsion_min));
        literals.push(t2.gt(&repulsion_max));
        self.assert_any(literals);
    }

    // ---------- weak non-overlap theories ----------

    /// Plain weak non-overlap of bed-level footprints, no temporal guards.
    pub fn introduce_polygon_weak_nonoverlapping(
        &self,
        variables: &DecisionVariables<'ctx>,
        values_x: &[Rational],
        values_y: &[Rational],
        fixed: &[usize],
        undecided: &[usize],
        polygons: &[Polygon],
    ) {
        for (k, &i) in undecided.iter().enumerate() {
            for &j in &undecided[k + 1..] {
                let pose_i = Pose::free(variables, i);
                let pose_j = Pose::free(variables, j);
                self.introduce_polygon_outside_polygon(
                    ConstraintMode::Plain,
                    &pose_i,
                    &polygons[i],
                    &pose_j,
                    std::slice::from_ref(&polygons[j]),
                );
            }
        }
        for &u in undecided {
            for &f in fixed {
                let pose_u = Pose::free(variables, u);
                let pose_f = Pose::fixed(values_x[f], values_y[f], Rational::default());
                self.introduce_polygon_outside_polygon(
                    ConstraintMode::Plain,
                    &pose_u,
                    &polygons[u],
                    &pose_f,
                    std::slice::from_ref(&polygons[f]),
                );
            }
        }
    }

    /// Eager variant of the non-overlap theory: besides the vertex clauses,
    /// every edge pair gets its line non-intersection clause up front. Only
    /// viable for a handful of small polygons; the scheduler uses the weak
    /// form plus refinement instead.
    pub fn introduce_polygon_strong_nonoverlapping(
        &mut self,
        variables: &DecisionVariables<'ctx>,
        undecided: &[usize],
        polygons: &[Polygon],
    ) {
        self.introduce_polygon_weak_nonoverlapping(
            variables,
            &[],
            &[],
            &[],
            undecided,
            polygons,
        );
        for (k, &i) in undecided.iter().enumerate() {
            for &j in &undecided[k + 1..] {
                for edge_i in polygons[i].lines() {
                    for edge_j in polygons[j].lines() {
                        let pose_i = Pose::free(variables, i);
                        let pose_j = Pose::free(variables, j);
                        self.introduce_line_non_intersection(
                            ConstraintMode::Plain,
                            &pose_i,
                            &edge_i,
                            &pose_j,
                            &edge_j,
                        );
                    }
                }
            }
        }
    }

    /// Weak non-overlap with temporal guards: for every pair both print-order
    /// scenarios are asserted, each binding the earlier footprint against the
    /// later object's unreachable zones. Consequential mode uses the
    /// size-gated external form.
    #[allow(clippy::too_many_arguments)]
    pub fn introduce_sequential_polygon_weak_nonoverlapping(
        &self,
        mode: ConstraintMode,
        variables: &DecisionVariables<'ctx>,
        values_x: &[Rational],
        values_y: &[Rational],
        values_t: &[Rational],
        fixed: &[usize],
        undecided: &[usize],
        polygons: &[Polygon],
        unreachable_polygons: &[Vec<Polygon>],
    ) {
        let pair = |earlier: &Pose<'_, 'ctx>,
                    earlier_footprint: &Polygon,
                    later: &Pose<'_, 'ctx>,
                    later_zones: &[Polygon]| {
            if mode == ConstraintMode::Consequential {
                self.introduce_polygon_external_polygon(
                    mode,
                    earlier,
                    earlier_footprint,
                    later,
                    later_zones,
                );
            } else {
                self.introduce_polygon_outside_polygon(
                    mode,
                    earlier,
                    earlier_footprint,
                    later,
                    later_zones,
                );
            }
        };

        for (k, &i) in undecided.iter().enumerate() {
            for &j in &undecided[k + 1..] {
                let pose_i = Pose::free(variables, i);
                let pose_j = Pose::free(variables, j);
                pair(&pose_i, &polygons[i], &pose_j, &unreachable_polygons[j]);
                pair(&pose_j, &polygons[j], &pose_i, &unreachable_polygons[i]);
            }
        }
        for &u in undecided {
            for &f in fixed {
                let pose_u = Pose::free(variables, u);
                let pose_f = Pose::fixed(values_x[f], values_y[f], values_t[f]);
                pair(&pose_u, &polygons[u], &pose_f, &unreachable_polygons[f]);
                pair(&pose_f, &polygons[f], &pose_u, &unreachable_polygons[u]);
            }
        }
    }
}
