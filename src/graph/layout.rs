// Force-directed layout
//
// A long-lived simulation that owns every node's position, velocity and pin.
// The graph model hands it membership and links through `sync`; the frame
// loop advances it with `step`. Kinetic state survives syncs for nodes that
// stay in the graph and is dropped for nodes that leave it.

use super::{GraphDelta, GraphModel};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use tracing::{debug, info};

/// Default world width in layout units
pub const DEFAULT_WORLD_WIDTH: f64 = 800.0;

/// Default world height in layout units
pub const DEFAULT_WORLD_HEIGHT: f64 = 600.0;

/// Tuning for the force simulation
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    pub width: f64,
    pub height: f64,

    /// Rest length of links between peers
    pub link_distance: f64,
    /// Rest length of links touching the gateway
    pub backbone_distance: f64,
    /// Fraction of the length error corrected per step
    pub link_strength: f64,

    /// Pairwise charge; negative repels
    pub charge_strength: f64,
    /// Distances below this are clamped when computing charge
    pub charge_distance_min: f64,

    /// Weak pull of the layout's mean position toward the center
    pub center_strength: f64,

    /// Collision radius of every node
    pub collide_radius: f64,
    pub collide_strength: f64,

    pub alpha_min: f64,
    pub alpha_decay: f64,
    /// Fraction of velocity lost per step
    pub velocity_decay: f64,

    /// Reheat only if energy has cooled below this
    pub reheat_threshold: f64,
    /// Energy restored by a reheat
    pub reheat_alpha: f64,
    /// Energy target held while a node is being dragged
    pub drag_alpha_target: f64,

    /// New nodes spawn within ±spawn_jitter of their anchor
    pub spawn_jitter: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        let alpha_min: f64 = 0.001;
        Self {
            width: DEFAULT_WORLD_WIDTH,
            height: DEFAULT_WORLD_HEIGHT,
            link_distance: 80.0,
            backbone_distance: 180.0,
            link_strength: 0.3,
            charge_strength: -250.0,
            charge_distance_min: 1.0,
            center_strength: 0.05,
            collide_radius: 40.0,
            collide_strength: 0.7,
            alpha_min,
            // Cools from 1.0 to alpha_min in ~300 steps
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
            velocity_decay: 0.4,
            reheat_threshold: 0.1,
            reheat_alpha: 0.3,
            drag_alpha_target: 0.3,
            spawn_jitter: 25.0,
        }
    }
}

impl LayoutConfig {
    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }
}

/// Kinetic state of one node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    /// Fixed position overriding the forces
    pub pin: Option<(f64, f64)>,
}

impl Body {
    fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            pin: None,
        }
    }

    fn pinned(x: f64, y: f64) -> Self {
        Self {
            pin: Some((x, y)),
            ..Self::at(x, y)
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Spring {
    source: usize,
    target: usize,
    distance: f64,
    /// Share of the correction applied to the target
    bias: f64,
}

/// Continuously running force simulation
pub struct ForceLayout {
    config: LayoutConfig,
    gateway: String,
    ids: Vec<String>,
    bodies: Vec<Body>,
    index: HashMap<String, usize>,
    springs: Vec<Spring>,
    alpha: f64,
    alpha_target: f64,
    dragging: Option<String>,
    rng: ChaCha8Rng,
}

impl ForceLayout {
    /// Create a layout with the gateway pinned at the center
    pub fn new(config: LayoutConfig, gateway: impl Into<String>, seed: u64) -> Self {
        let mut layout = Self {
            config,
            gateway: gateway.into(),
            ids: Vec::new(),
            bodies: Vec::new(),
            index: HashMap::new(),
            springs: Vec::new(),
            alpha: 1.0,
            alpha_target: 0.0,
            dragging: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
        };
        layout.insert_gateway();
        layout
    }

    fn insert_gateway(&mut self) {
        let (cx, cy) = self.config.center();
        self.index.insert(self.gateway.clone(), self.ids.len());
        self.ids.push(self.gateway.clone());
        self.bodies.push(Body::pinned(cx, cy));
    }

    #[cfg(test)]
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    #[cfg(test)]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    #[cfg(test)]
    pub fn alpha_target(&self) -> f64 {
        self.alpha_target
    }

    /// Cooled down with nothing holding the energy up
    pub fn is_settled(&self) -> bool {
        self.alpha < self.config.alpha_min && self.alpha_target < self.config.alpha_min
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn body(&self, id: &str) -> Option<&Body> {
        self.index.get(id).map(|&i| &self.bodies[i])
    }

    pub fn position(&self, id: &str) -> Option<(f64, f64)> {
        self.body(id).map(|b| (b.x, b.y))
    }

    pub fn bodies(&self) -> impl Iterator<Item = (&str, &Body)> {
        self.ids.iter().map(String::as_str).zip(self.bodies.iter())
    }

    pub fn dragging(&self) -> Option<&str> {
        self.dragging.as_deref()
    }

    /// Adopt the graph's current membership and links
    ///
    /// Bodies of removed nodes are discarded, new nodes are seeded near the
    /// gateway with random jitter, and springs are rebuilt. If the delta is
    /// non-empty and the layout has cooled down, it is reheated.
    pub fn sync(&mut self, graph: &GraphModel, delta: &GraphDelta) {
        // Drop bodies for nodes that left the graph
        if self.ids.iter().any(|id| !graph.contains(id)) {
            let mut ids = Vec::with_capacity(graph.node_count());
            let mut bodies = Vec::with_capacity(graph.node_count());
            for (id, body) in self.ids.drain(..).zip(self.bodies.drain(..)) {
                if graph.contains(&id) {
                    ids.push(id);
                    bodies.push(body);
                }
            }
            self.ids = ids;
            self.bodies = bodies;
            if let Some(dragged) = &self.dragging {
                if !graph.contains(dragged) {
                    self.dragging = None;
                    self.alpha_target = 0.0;
                }
            }
        }

        self.reindex();

        // Seed new nodes near an existing anchor
        let anchor = self
            .index
            .get(&self.gateway)
            .copied()
            .or(if self.bodies.is_empty() { None } else { Some(0) })
            .map(|i| (self.bodies[i].x, self.bodies[i].y))
            .unwrap_or_else(|| self.config.center());
        let jitter = self.config.spawn_jitter;
        for node in graph.nodes() {
            if self.index.contains_key(&node.id) {
                continue;
            }
            let body = if node.id == self.gateway {
                let (cx, cy) = self.config.center();
                Body::pinned(cx, cy)
            } else {
                Body::at(
                    anchor.0 + self.rng.gen_range(-jitter..=jitter),
                    anchor.1 + self.rng.gen_range(-jitter..=jitter),
                )
            };
            self.index.insert(node.id.clone(), self.ids.len());
            self.ids.push(node.id.clone());
            self.bodies.push(body);
        }

        self.rebuild_springs(graph);

        if !delta.is_empty() && self.alpha < self.config.reheat_threshold {
            info!(
                alpha = self.alpha,
                nodes = self.bodies.len(),
                "Reheating layout after topology change"
            );
            self.alpha = self.config.reheat_alpha;
        }
    }

    fn reindex(&mut self) {
        self.index = self
            .ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
    }

    fn rebuild_springs(&mut self, graph: &GraphModel) {
        let mut degree = vec![0usize; self.bodies.len()];
        let mut pairs = Vec::with_capacity(graph.links().len());
        for link in graph.links() {
            let (Some(&s), Some(&t)) = (self.index.get(link.source()), self.index.get(link.target()))
            else {
                continue;
            };
            degree[s] += 1;
            degree[t] += 1;
            let backbone = link.key.touches(&self.gateway);
            pairs.push((s, t, backbone));
        }

        self.springs = pairs
            .into_iter()
            .map(|(source, target, backbone)| Spring {
                source,
                target,
                distance: if backbone {
                    self.config.backbone_distance
                } else {
                    self.config.link_distance
                },
                bias: degree[source] as f64 / (degree[source] + degree[target]) as f64,
            })
            .collect();
    }

    /// Advance the simulation by one step
    ///
    /// Returns false when the layout is settled and nothing moved.
    pub fn step(&mut self) -> bool {
        if self.is_settled() || self.bodies.is_empty() {
            return false;
        }

        self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;

        self.apply_links();
        self.apply_charge();
        self.apply_center();
        self.apply_collision();

        let keep = 1.0 - self.config.velocity_decay;
        for body in &mut self.bodies {
            match body.pin {
                Some((px, py)) => {
                    body.x = px;
                    body.y = py;
                    body.vx = 0.0;
                    body.vy = 0.0;
                }
                None => {
                    body.vx *= keep;
                    body.vy *= keep;
                    body.x += body.vx;
                    body.y += body.vy;
                }
            }
        }

        if self.is_settled() {
            debug!(nodes = self.bodies.len(), "Layout settled");
        }
        true
    }

    fn jiggle(&mut self) -> f64 {
        (self.rng.gen::<f64>() - 0.5) * 1e-6
    }

    fn apply_links(&mut self) {
        let strength = self.config.link_strength * self.alpha;
        for i in 0..self.springs.len() {
            let spring = self.springs[i];
            let s = self.bodies[spring.source];
            let t = self.bodies[spring.target];

            let mut dx = t.x + t.vx - s.x - s.vx;
            let mut dy = t.y + t.vy - s.y - s.vy;
            if dx == 0.0 {
                dx = self.jiggle();
            }
            if dy == 0.0 {
                dy = self.jiggle();
            }
            let len = (dx * dx + dy * dy).sqrt();
            let k = (len - spring.distance) / len * strength;
            dx *= k;
            dy *= k;

            let target = &mut self.bodies[spring.target];
            target.vx -= dx * spring.bias;
            target.vy -= dy * spring.bias;
            let source = &mut self.bodies[spring.source];
            source.vx += dx * (1.0 - spring.bias);
            source.vy += dy * (1.0 - spring.bias);
        }
    }

    fn apply_charge(&mut self) {
        let n = self.bodies.len();
        let strength = self.config.charge_strength * self.alpha;
        let min2 = self.config.charge_distance_min * self.config.charge_distance_min;

        for i in 0..n {
            for j in (i + 1)..n {
                let mut dx = self.bodies[j].x - self.bodies[i].x;
                let mut dy = self.bodies[j].y - self.bodies[i].y;
                if dx == 0.0 {
                    dx = self.jiggle();
                }
                if dy == 0.0 {
                    dy = self.jiggle();
                }
                let mut l2 = dx * dx + dy * dy;
                if l2 < min2 {
                    l2 = (min2 * l2).sqrt();
                }
                let w = strength / l2;
                // Negative strength pushes i away from j and j away from i
                self.bodies[i].vx += dx * w;
                self.bodies[i].vy += dy * w;
                self.bodies[j].vx -= dx * w;
                self.bodies[j].vy -= dy * w;
            }
        }
    }

    fn apply_center(&mut self) {
        let n = self.bodies.len() as f64;
        let (cx, cy) = self.config.center();
        let (sx, sy) = self
            .bodies
            .iter()
            .fold((0.0, 0.0), |(sx, sy), b| (sx + b.x, sy + b.y));
        let shift_x = (sx / n - cx) * self.config.center_strength;
        let shift_y = (sy / n - cy) * self.config.center_strength;
        for body in &mut self.bodies {
            body.x -= shift_x;
            body.y -= shift_y;
        }
    }

    fn apply_collision(&mut self) {
        let n = self.bodies.len();
        let r = self.config.collide_radius;
        let min_dist = r + r;
        let strength = self.config.collide_strength;

        for i in 0..n {
            let xi = self.bodies[i].x + self.bodies[i].vx;
            let yi = self.bodies[i].y + self.bodies[i].vy;
            for j in (i + 1)..n {
                let mut dx = xi - self.bodies[j].x - self.bodies[j].vx;
                let mut dy = yi - self.bodies[j].y - self.bodies[j].vy;
                let l2 = dx * dx + dy * dy;
                if l2 >= min_dist * min_dist {
                    continue;
                }
                if dx == 0.0 {
                    dx = self.jiggle();
                }
                if dy == 0.0 {
                    dy = self.jiggle();
                }
                let len = (dx * dx + dy * dy).sqrt();
                let k = (min_dist - len) / len * strength;
                dx *= k;
                dy *= k;
                // Equal radii: the correction is split evenly
                self.bodies[i].vx += dx * 0.5;
                self.bodies[i].vy += dy * 0.5;
                self.bodies[j].vx -= dx * 0.5;
                self.bodies[j].vy -= dy * 0.5;
            }
        }
    }

    /// Pin a node under the pointer and keep the layout warm while dragging
    pub fn drag_start(&mut self, id: &str, x: f64, y: f64) -> bool {
        let Some(&i) = self.index.get(id) else {
            return false;
        };
        self.bodies[i].pin = Some((x, y));
        self.dragging = Some(id.to_string());
        self.alpha_target = self.config.drag_alpha_target;
        true
    }

    /// Move the pin of the node being dragged
    pub fn drag_to(&mut self, x: f64, y: f64) {
        let Some(id) = self.dragging.as_ref() else {
            return;
        };
        if let Some(&i) = self.index.get(id) {
            self.bodies[i].pin = Some((x, y));
        }
    }

    /// Release the dragged node and let the layout cool down
    ///
    /// The gateway goes back to its permanent pin at the center.
    pub fn drag_end(&mut self) {
        self.alpha_target = 0.0;
        let Some(id) = self.dragging.take() else {
            return;
        };
        let center = self.config.center();
        if let Some(&i) = self.index.get(&id) {
            self.bodies[i].pin = if id == self.gateway { Some(center) } else { None };
        }
    }

    /// Nearest node whose center lies within `radius` of a point
    pub fn node_at(&self, x: f64, y: f64, radius: f64) -> Option<&str> {
        let r2 = radius * radius;
        self.bodies()
            .map(|(id, b)| (id, (b.x - x).powi(2) + (b.y - y).powi(2)))
            .filter(|(_, d2)| *d2 <= r2)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Discard all kinetic state
    pub fn teardown(&mut self) {
        self.ids.clear();
        self.bodies.clear();
        self.index.clear();
        self.springs.clear();
        self.dragging = None;
        self.alpha_target = 0.0;
    }
}
