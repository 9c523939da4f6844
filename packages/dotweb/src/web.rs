//! The web data model: dots, springs, arms.

use vek::*;


/// Point mass in a spring web.
///
/// The driver owns the node storage (a slice or vec) and is free to write position and
/// velocity between steps; the integrator picks up such writes on the next `step`. Radius
/// and mass must stay positive for the whole lifetime of the node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Position.
    pub pos: Vec2<f64>,
    /// Velocity.
    pub vel: Vec2<f64>,
    /// Radius. Positive.
    pub radius: f64,
    /// Mass. Positive.
    pub mass: f64,
    /// Rendering angle, recomputed by each `step` as the weighted average orientation of
    /// all arms touching this node. Purely visual. External writes between steps are
    /// honored by the next step's torque pass.
    pub angle: f64,
    /// Weighted angle accumulator, only meaningful inside the averaging pass.
    pub(crate) angle_sum: f64,
    /// Accumulated arm weight, only meaningful inside the averaging pass.
    pub(crate) weight_sum: f64,
    /// Springs owned by this node. Each aims at another node in the same storage.
    pub springs: Vec<Spring>,
}

impl Node {
    /// New motionless node with no springs.
    pub fn new(pos: impl Into<Vec2<f64>>, radius: f64, mass: f64) -> Self {
        assert!(radius > 0.0, "node radius must be positive");
        assert!(mass > 0.0, "node mass must be positive");
        Node {
            pos: pos.into(),
            vel: Vec2::zero(),
            radius,
            mass,
            angle: 0.0,
            angle_sum: 0.0,
            weight_sum: 0.0,
            springs: Vec::new(),
        }
    }

    /// Apply a force over a duration, changing velocity only.
    pub(crate) fn accelerate(&mut self, force: Vec2<f64>, dt: f64) {
        self.vel += force * (dt / self.mass);
    }
}

/// Directed connection between two nodes: a linear spring plus a rotational arm at each
/// endpoint. Owned by the node it starts from; `to` indexes the target node in the same
/// storage and carries no ownership.
#[derive(Debug, Clone, PartialEq)]
pub struct Spring {
    /// Index of the target node. Must differ from the owner's index and stay in bounds.
    pub to: usize,
    /// Linear stiffness.
    pub k: f64,
    /// Rest separation, captured at creation. The integrator never changes it.
    pub(crate) rest_length: f64,
    /// Separation observed on the previous step, for the lengthening/shortening bias.
    pub(crate) prev_length: f64,
    /// Rotational record at the owning node's end.
    pub from_arm: Arm,
    /// Rotational record at the target node's end.
    pub to_arm: Arm,
}

impl Spring {
    /// Rest separation of the two endpoints.
    pub fn rest_length(&self) -> f64 {
        self.rest_length
    }

    /// Change the rest separation. The integrator never calls this; it exists for scene
    /// code that re-spaces a chain of nodes between steps.
    pub fn set_rest_length(&mut self, rest_length: f64) {
        self.rest_length = rest_length;
    }
}

/// One endpoint's rotational stiffness record on a spring. Tracks the bearing from its
/// owning node to the other node as a continuous angle: the wrapped atan2 bearing plus a
/// signed count of full turns. The count stays correct only while the true bearing change
/// per step is below half a turn.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Arm {
    /// Rotational stiffness.
    pub torque_k: f64,
    /// Stiffness over current separation, refreshed by every torque pass.
    pub(crate) weight: f64,
    /// Bearing from the owning node to the other node at creation.
    pub(crate) init_angle: f64,
    /// Last wrapped bearing, in (-pi, pi].
    pub(crate) prev_angle: f64,
    /// Last angle-minus-rest value, for the resistance bias direction.
    pub(crate) prev_unrest: f64,
    /// Signed count of full turns accumulated beyond the wrapped bearing.
    pub(crate) rotations: i32,
}

impl Arm {
    pub(crate) fn new(torque_k: f64, init_angle: f64) -> Self {
        Arm {
            torque_k,
            weight: 0.0,
            init_angle,
            prev_angle: 0.0,
            prev_unrest: 0.0,
            rotations: 0,
        }
    }

    /// Unwrapped bearing from the owning node to the other node: continuous across the
    /// ±pi seam, so it can be compared against rest bearings that have wound past a full
    /// turn. Valid under the bounded-step precondition described on the crate.
    pub fn angle(&self) -> f64 {
        self.prev_angle + self.rotations as f64 * std::f64::consts::TAU
    }

    /// Fold a newly observed wrapped bearing in, bumping the turn counter when the raw
    /// value jumps across the ±pi seam.
    pub(crate) fn update_angle(&mut self, angle: f64) {
        let diff = angle - self.prev_angle;
        self.prev_angle = angle;
        if diff > std::f64::consts::PI {
            self.rotations -= 1;
        }
        if diff < -std::f64::consts::PI {
            self.rotations += 1;
        }
    }

    /// Rewind the winding state to the creation bearing.
    pub(crate) fn reset(&mut self) {
        self.prev_angle = self.init_angle;
        self.rotations = 0;
    }
}

/// Directional resistance biases. A fixed bias opposes whichever way a length or bearing
/// is currently changing, which kills perpetual micro-oscillation at rest the way
/// velocity-proportional damping would not.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Resistance {
    /// Bias on the linear spring force, applied by lengthening/shortening direction.
    pub spring: f64,
    /// Bias on an arm's unrest angle, scaled by current separation.
    pub arm: f64,
}

impl Default for Resistance {
    fn default() -> Self {
        Resistance {
            spring: 1e-9,
            arm: 1e-8,
        }
    }
}

/// Wrapped bearing angle from one position to another.
pub(crate) fn bearing(from: Vec2<f64>, to: Vec2<f64>) -> f64 {
    (to.y - from.y).atan2(to.x - from.x)
}

/// Link two nodes with a spring. Rest separation and both arms' rest bearings are
/// captured from the nodes' current geometry. Endpoints must be distinct; panics
/// otherwise, since a self-spring has no defined geometry.
pub fn add_spring(nodes: &mut [Node], from: usize, to: usize, k: f64, torque_k: f64) {
    assert!(from != to, "spring endpoints must be distinct");
    let rest_length = (nodes[to].pos - nodes[from].pos).magnitude();
    let from_arm = Arm::new(torque_k, bearing(nodes[from].pos, nodes[to].pos));
    let to_arm = Arm::new(torque_k, bearing(nodes[to].pos, nodes[from].pos));
    nodes[from].springs.push(Spring {
        to,
        k,
        rest_length,
        prev_length: rest_length,
        from_arm,
        to_arm,
    });
}


#[test]
fn test_add_spring_captures_rest_geometry() {
    let mut nodes = vec![
        Node::new([0.0, 0.0], 1.0, 1.0),
        Node::new([3.0, 4.0], 1.0, 1.0),
    ];
    add_spring(&mut nodes, 1, 0, 2.0, 500.0);

    let spring = &nodes[1].springs[0];
    assert_eq!(spring.to, 0);
    assert_eq!(spring.rest_length(), 5.0);
    assert_eq!(spring.prev_length, 5.0);
    assert_eq!(spring.from_arm.init_angle, (-4.0f64).atan2(-3.0));
    assert_eq!(spring.to_arm.init_angle, 4.0f64.atan2(3.0));
    // the wrapped bearing is not primed until prepare
    assert_eq!(spring.from_arm.prev_angle, 0.0);
    assert_eq!(spring.from_arm.rotations, 0);
}

#[test]
#[should_panic(expected = "node radius must be positive")]
fn test_zero_radius_rejected() {
    Node::new([0.0, 0.0], 0.0, 1.0);
}

#[test]
#[should_panic(expected = "spring endpoints must be distinct")]
fn test_self_spring_rejected() {
    let mut nodes = vec![Node::new([0.0, 0.0], 1.0, 1.0)];
    add_spring(&mut nodes, 0, 0, 1.0, 0.0);
}
