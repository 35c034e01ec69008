use crate::misc::FloatingPoint;

/// Tolerances shared by every operation of one regularization run.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tolerances<T: FloatingPoint> {
    /// Geometric distance tolerance.
    pub epsge: T,
    /// Coarser distance tolerance for topological decisions, e.g. snapping a split point to a vertex.
    pub tol2: T,
    /// Angle tolerance in radians for corner and tangent tests.
    pub angtol: T,
    /// Largest turning angle in radians accepted between consecutive pieces of a general division curve.
    pub bend: T,
}

impl<T: FloatingPoint> Default for Tolerances<T> {
    fn default() -> Self {
        Self {
            epsge: nalgebra::convert(1e-6),
            tol2: nalgebra::convert(1e-4),
            angtol: nalgebra::convert(5_f64.to_radians()),
            bend: nalgebra::convert(60_f64.to_radians()),
        }
    }
}

impl<T: FloatingPoint> Tolerances<T> {
    pub fn with_epsge(mut self, epsge: T) -> Self {
        self.epsge = epsge;
        self
    }

    pub fn with_tol2(mut self, tol2: T) -> Self {
        self.tol2 = tol2;
        self
    }

    pub fn with_angtol(mut self, angtol: T) -> Self {
        self.angtol = angtol;
        self
    }

    pub fn with_bend(mut self, bend: T) -> Self {
        self.bend = bend;
        self
    }
}

/// Ranking and relaxation policy for choosing a split target.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CandidateOptions<T: FloatingPoint> {
    /// Largest angle between the inward direction and a chord to a candidate.
    pub max_angle: T,
    /// Factor applied to `max_angle` when selecting with `strong` relaxation.
    pub strong_relaxation: T,
    /// Weight of the distance to the ideal split point in the score.
    pub distance_weight: T,
    /// Weight of the misalignment with the inward direction in the score.
    pub angle_weight: T,
}

impl<T: FloatingPoint> Default for CandidateOptions<T> {
    fn default() -> Self {
        Self {
            max_angle: T::frac_pi_4(),
            strong_relaxation: nalgebra::convert(2.0),
            distance_weight: T::one(),
            angle_weight: T::one(),
        }
    }
}

impl<T: FloatingPoint> CandidateOptions<T> {
    pub fn with_max_angle(mut self, max_angle: T) -> Self {
        self.max_angle = max_angle;
        self
    }

    pub fn with_strong_relaxation(mut self, strong_relaxation: T) -> Self {
        self.strong_relaxation = strong_relaxation;
        self
    }

    pub fn with_distance_weight(mut self, distance_weight: T) -> Self {
        self.distance_weight = distance_weight;
        self
    }

    pub fn with_angle_weight(mut self, angle_weight: T) -> Self {
        self.angle_weight = angle_weight;
        self
    }

    /// Angular acceptance limit, widened when `strong` is set.
    /// The relaxed limit never exceeds 3/4 pi so a chord cannot run backwards along the boundary.
    pub fn max_angle(&self, strong: bool) -> T {
        if strong {
            let limit = T::frac_pi_2() + T::frac_pi_4();
            (self.max_angle * self.strong_relaxation).min(limit)
        } else {
            self.max_angle
        }
    }
}

/// Sampling used when building division curves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DivisionOptions {
    /// Interior samples checked against the 3D chord of a straight parameter line.
    pub straight_samples: usize,
    /// Number of pieces of a general division curve.
    pub general_samples: usize,
}

impl Default for DivisionOptions {
    fn default() -> Self {
        Self {
            straight_samples: 8,
            general_samples: 16,
        }
    }
}

impl DivisionOptions {
    pub fn with_straight_samples(mut self, straight_samples: usize) -> Self {
        self.straight_samples = straight_samples;
        self
    }

    pub fn with_general_samples(mut self, general_samples: usize) -> Self {
        self.general_samples = general_samples;
        self
    }
}

/// Options of the face regularization drivers.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegularizeOptions<T: FloatingPoint> {
    pub tolerances: Tolerances<T>,
    pub candidate: CandidateOptions<T>,
    pub division: DivisionOptions,
    /// Upper bound of splits for one driver run.
    pub max_splits: usize,
    /// Reject concave corners in the resulting faces.
    pub check_convex: bool,
    /// Treat vertices shared by three or more faces as corners in face sets.
    pub treat_t_joints_as_corners: bool,
}

impl<T: FloatingPoint> Default for RegularizeOptions<T> {
    fn default() -> Self {
        Self {
            tolerances: Tolerances::default(),
            candidate: CandidateOptions::default(),
            division: DivisionOptions::default(),
            max_splits: 64,
            check_convex: true,
            treat_t_joints_as_corners: true,
        }
    }
}

impl<T: FloatingPoint> RegularizeOptions<T> {
    pub fn with_tolerances(mut self, tolerances: Tolerances<T>) -> Self {
        self.tolerances = tolerances;
        self
    }

    pub fn with_candidate(mut self, candidate: CandidateOptions<T>) -> Self {
        self.candidate = candidate;
        self
    }

    pub fn with_division(mut self, division: DivisionOptions) -> Self {
        self.division = division;
        self
    }

    pub fn with_max_splits(mut self, max_splits: usize) -> Self {
        self.max_splits = max_splits;
        self
    }

    pub fn with_check_convex(mut self, check_convex: bool) -> Self {
        self.check_convex = check_convex;
        self
    }

    pub fn with_treat_t_joints_as_corners(mut self, treat_t_joints_as_corners: bool) -> Self {
        self.treat_t_joints_as_corners = treat_t_joints_as_corners;
        self
    }
}
