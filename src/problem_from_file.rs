//! Supports reading trajectory problems from YAML file (optional)

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::boundary::{BoundaryPolicy, BoundaryState, ConstraintFlags, KinematicState};
use crate::constraints::{to_vector3, DerivativeBounds};
use crate::cost::{SmoothnessCriterion, DEFAULT_COST_SAMPLES};
use crate::planner::PlannerConfig;
use crate::qp::SolverOptions;
use crate::reference_path::PolylinePath;
use crate::trajectory_error::TrajectoryError;
use crate::waypoints::{WaypointSampling, NUM_DISCRETIZATION};

fn default_weight() -> f64 { 1.0 }
fn default_cost_samples() -> usize { DEFAULT_COST_SAMPLES }
fn default_constraint_samples() -> usize { NUM_DISCRETIZATION }
fn zero_vector() -> Vec<f64> { vec![0.0; 3] }

#[derive(Deserialize)]
struct StateYaml {
    position: Vec<f64>,
    #[serde(default = "zero_vector")]
    velocity: Vec<f64>,
    #[serde(default = "zero_vector")]
    acceleration: Vec<f64>,
}

#[derive(Deserialize)]
struct BoundsYaml {
    velocity: Option<Vec<f64>>,
    acceleration: Option<Vec<f64>>,
    jerk: Option<Vec<f64>>,
}

#[derive(Deserialize)]
struct SolverYaml {
    max_iter: Option<u32>,
    /// Seconds
    time_limit: Option<f64>,
}

#[derive(Deserialize, Default, Clone, Copy)]
#[serde(rename_all = "snake_case")]
enum SmoothnessYaml {
    #[default]
    Velocity,
    Acceleration,
    Jerk,
}

#[derive(Deserialize, Default, Clone, Copy)]
#[serde(rename_all = "snake_case")]
enum PolicyYaml {
    #[default]
    Balanced,
    StartTight,
    EndTight,
    Custom,
}

#[derive(Deserialize, Default, Clone, Copy)]
#[serde(rename_all = "snake_case")]
enum SamplingYaml {
    #[default]
    Uniform,
    ControlPolygon,
}

#[derive(Deserialize)]
struct Root {
    duration: f64,
    #[serde(default = "default_weight")]
    weight_distance: f64,
    #[serde(default)]
    smoothness: SmoothnessYaml,
    #[serde(default)]
    policy: PolicyYaml,
    /// Flag names, only with the custom policy
    #[serde(default)]
    flags: Vec<String>,
    start: StateYaml,
    end: StateYaml,
    /// Reference polyline, straight line from start to end if missing
    #[serde(default)]
    path: Vec<Vec<f64>>,
    bounds: Option<BoundsYaml>,
    #[serde(default = "default_cost_samples")]
    cost_samples: usize,
    #[serde(default)]
    sampling: SamplingYaml,
    #[serde(default = "default_constraint_samples")]
    constraint_samples: usize,
    solver: Option<SolverYaml>,
}

/// Trajectory request as read from a problem file.
#[derive(Debug, Clone)]
pub struct ProblemFile {
    pub boundary: BoundaryState,
    pub duration: f64,
    pub weight_distance: f64,
    pub smoothness: SmoothnessCriterion,
    pub path: PolylinePath,
    pub config: PlannerConfig,
}

impl ProblemFile {
    /// Read the problem from YAML file. YAML file like this is supported:
    /// ```yaml
    /// duration: 1.0
    /// weight_distance: 0.8
    /// smoothness: jerk            # velocity (default), acceleration or jerk
    /// policy: balanced            # balanced (default), start_tight, end_tight or custom
    /// # flags: [INIT_POS, INIT_VEL, END_POS]   # with policy: custom
    /// start:
    ///   position: [0.0, 0.0, 0.0]
    ///   velocity: [0.0, 0.0, 0.0]
    ///   acceleration: [0.0, 0.0, 0.0]
    /// end:
    ///   position: [1.0, 0.0, 0.2]
    /// path: [[0.0, 0.0, 0.0], [0.5, 0.0, 0.3], [1.0, 0.0, 0.2]]
    /// bounds:
    ///   velocity: [5.0, 5.0, 5.0]
    ///   acceleration: [50.0, 50.0, 50.0]
    ///   jerk: [1000.0, 1000.0, 1000.0]
    /// cost_samples: 50
    /// sampling: uniform           # uniform (default) or control_polygon
    /// constraint_samples: 11
    /// solver:
    ///   max_iter: 200
    ///   time_limit: 0.5
    /// ```
    /// Only `duration`, `start.position` and `end.position` are required. Velocities and
    /// accelerations default to zero, bounds and sample counts to the planner defaults.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, TrajectoryError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        debug!("Reading problem file {}", path.as_ref().display());
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, TrajectoryError> {
        let root: Root = serde_saphyr::from_str(contents)
            .map_err(|e| TrajectoryError::ParseError(format!("{}", e)))?;

        let boundary = BoundaryState::new(to_state(&root.start)?, to_state(&root.end)?);

        let path = if root.path.is_empty() {
            vec![boundary.start.position, boundary.end.position]
        } else {
            root.path.iter().map(|p| to_vector3(p)).collect::<Result<Vec<_>, _>>()?
        };
        let path = PolylinePath::new(path).map_err(|e| TrajectoryError::ParseError(format!("{}", e)))?;

        let policy = match root.policy {
            PolicyYaml::Balanced => BoundaryPolicy::Balanced,
            PolicyYaml::StartTight => BoundaryPolicy::StartTight,
            PolicyYaml::EndTight => BoundaryPolicy::EndTight,
            PolicyYaml::Custom => BoundaryPolicy::Custom(parse_flags(&root.flags)?),
        };
        if !root.flags.is_empty() && !matches!(root.policy, PolicyYaml::Custom) {
            return Err(TrajectoryError::ParseError(
                "flags are only accepted with policy: custom".into(),
            ));
        }

        let mut bounds = DerivativeBounds::default();
        if let Some(b) = &root.bounds {
            if let Some(v) = &b.velocity {
                bounds.velocity = to_vector3(v)?;
            }
            if let Some(v) = &b.acceleration {
                bounds.acceleration = to_vector3(v)?;
            }
            if let Some(v) = &b.jerk {
                bounds.jerk = to_vector3(v)?;
            }
        }

        let mut solver = SolverOptions::default();
        if let Some(s) = &root.solver {
            if let Some(max_iter) = s.max_iter {
                solver.max_iterations = max_iter;
            }
            if let Some(seconds) = s.time_limit {
                let limit = Duration::try_from_secs_f64(seconds).map_err(|_| {
                    TrajectoryError::ParseError(format!(
                        "solver time_limit must be a non negative number of seconds (got {})", seconds
                    ))
                })?;
                solver.time_limit = Some(limit);
            }
        }

        let sampling = match root.sampling {
            SamplingYaml::Uniform => WaypointSampling::Uniform { count: root.constraint_samples },
            SamplingYaml::ControlPolygon => WaypointSampling::ControlPolygon,
        };

        let smoothness = match root.smoothness {
            SmoothnessYaml::Velocity => SmoothnessCriterion::Velocity,
            SmoothnessYaml::Acceleration => SmoothnessCriterion::Acceleration,
            SmoothnessYaml::Jerk => SmoothnessCriterion::Jerk,
        };

        Ok(ProblemFile {
            boundary,
            duration: root.duration,
            weight_distance: root.weight_distance,
            smoothness,
            path,
            config: PlannerConfig {
                policy,
                bounds,
                sampling,
                cost_samples: root.cost_samples,
                solver,
            },
        })
    }
}

fn to_state(state: &StateYaml) -> Result<KinematicState, TrajectoryError> {
    Ok(KinematicState::new(
        to_vector3(&state.position)?,
        to_vector3(&state.velocity)?,
        to_vector3(&state.acceleration)?,
    ))
}

fn parse_flags(names: &[String]) -> Result<ConstraintFlags, TrajectoryError> {
    let mut flags = ConstraintFlags::NONE;
    for name in names {
        let flag = ConstraintFlags::from_name(&name.to_uppercase()).ok_or_else(|| {
            TrajectoryError::ParseError(format!("unknown constraint flag '{}'", name))
        })?;
        flags |= flag;
    }
    Ok(flags)
}
