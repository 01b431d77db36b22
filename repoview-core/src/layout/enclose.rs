// Smallest circle enclosing a set of circles.
//
// Welzl-style incremental construction over a shuffled input, keeping a basis
// of at most three circles that define the current enclosure. Shuffling uses a
// fixed-seed LCG, so identical input always gives identical output.
//
// Floating point can make the basis search fail on near-degenerate input
// (coincident or nested circles). In that case, or if the result is not
// finite, we fall back to a bounding-box centered enclosure. Either way the
// returned radius is widened to cover every input circle.

use super::Circle;

/// Upper bound on restarts, relative to input length, before giving up on the exact enclosure.
const MAX_RESTARTS_PER_CIRCLE: usize = 64;

/// Linear congruential generator with the constants from Numerical Recipes.
#[derive(Debug, Clone)]
pub struct Lcg {
    state: u64,
}

impl Lcg {
    const A: u64 = 1_664_525;
    const C: u64 = 1_013_904_223;
    const M: u64 = 1 << 32;

    pub fn new(seed: u64) -> Self {
        Self { state: seed % Self::M }
    }

    /// Uniform in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        self.state = (Self::A * self.state + Self::C) % Self::M;
        self.state as f64 / Self::M as f64
    }

    /// Tiny nonzero offset used to separate coincident points.
    pub fn jiggle(&mut self) -> f64 {
        let j = (self.next_f64() - 0.5) * 1e-6;
        if j == 0.0 { 1e-7 } else { j }
    }
}

fn shuffle(circles: &mut [Circle], rng: &mut Lcg) {
    let mut m = circles.len();
    while m > 0 {
        let i = (rng.next_f64() * m as f64) as usize;
        m -= 1;
        circles.swap(m, i.min(m));
    }
}

pub fn enclose(circles: &[Circle]) -> Circle {
    if circles.is_empty() {
        return Circle::default();
    }

    let mut shuffled = circles.to_vec();
    shuffle(&mut shuffled, &mut Lcg::new(1));

    let exact = welzl(&shuffled).filter(|e| e.x.is_finite() && e.y.is_finite() && e.r.is_finite());
    let base = exact.unwrap_or_else(|| bounding_enclosure(circles));
    cover(base, circles)
}

fn welzl(circles: &[Circle]) -> Option<Circle> {
    let n = circles.len();
    let budget = n.saturating_mul(MAX_RESTARTS_PER_CIRCLE).max(16);

    let mut basis: Vec<Circle> = Vec::with_capacity(3);
    let mut current: Option<Circle> = None;
    let mut restarts = 0;
    let mut i = 0;

    while i < n {
        let p = circles[i];
        if current.is_some_and(|e| encloses_weak(&e, &p)) {
            i += 1;
            continue;
        }
        restarts += 1;
        if restarts > budget {
            return None;
        }
        basis = extend_basis(&basis, p)?;
        current = Some(enclose_basis(&basis)?);
        i = 0;
    }
    current
}

fn extend_basis(basis: &[Circle], p: Circle) -> Option<Vec<Circle>> {
    if encloses_weak_all(&p, basis) {
        return Some(vec![p]);
    }

    for &b in basis {
        if encloses_not(&p, &b) && encloses_weak_all(&enclose_two(&b, &p), basis) {
            return Some(vec![b, p]);
        }
    }

    for i in 0..basis.len().saturating_sub(1) {
        for j in (i + 1)..basis.len() {
            let (bi, bj) = (basis[i], basis[j]);
            if encloses_not(&enclose_two(&bi, &bj), &p)
                && encloses_not(&enclose_two(&bi, &p), &bj)
                && encloses_not(&enclose_two(&bj, &p), &bi)
            {
                if let Some(e) = enclose_three(&bi, &bj, &p) {
                    if encloses_weak_all(&e, basis) {
                        return Some(vec![bi, bj, p]);
                    }
                }
            }
        }
    }

    None
}

/// `b` sticks out of `a`.
fn encloses_not(a: &Circle, b: &Circle) -> bool {
    let dr = a.r - b.r;
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dr < 0.0 || dr * dr < dx * dx + dy * dy
}

/// `a` contains `b`, with a relative tolerance.
fn encloses_weak(a: &Circle, b: &Circle) -> bool {
    let dr = a.r - b.r + a.r.max(b.r).max(1.0) * 1e-9;
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dr > 0.0 && dr * dr > dx * dx + dy * dy
}

fn encloses_weak_all(a: &Circle, basis: &[Circle]) -> bool {
    basis.iter().all(|b| encloses_weak(a, b))
}

fn enclose_basis(basis: &[Circle]) -> Option<Circle> {
    match basis {
        [a] => Some(*a),
        [a, b] => Some(enclose_two(a, b)),
        [a, b, c] => enclose_three(a, b, c),
        _ => None,
    }
}

fn enclose_two(a: &Circle, b: &Circle) -> Circle {
    let x21 = b.x - a.x;
    let y21 = b.y - a.y;
    let r21 = b.r - a.r;
    let l = (x21 * x21 + y21 * y21).sqrt();
    if l == 0.0 {
        return if a.r >= b.r { *a } else { *b };
    }
    Circle {
        x: (a.x + b.x + x21 / l * r21) / 2.0,
        y: (a.y + b.y + y21 / l * r21) / 2.0,
        r: (l + a.r + b.r) / 2.0,
    }
}

fn enclose_three(a: &Circle, b: &Circle, c: &Circle) -> Option<Circle> {
    let (x1, y1, r1) = (a.x, a.y, a.r);
    let (x2, y2, r2) = (b.x, b.y, b.r);
    let (x3, y3, r3) = (c.x, c.y, c.r);

    let a2 = x1 - x2;
    let a3 = x1 - x3;
    let b2 = y1 - y2;
    let b3 = y1 - y3;
    let c2 = r2 - r1;
    let c3 = r3 - r1;
    let d1 = x1 * x1 + y1 * y1 - r1 * r1;
    let d2 = d1 - x2 * x2 - y2 * y2 + r2 * r2;
    let d3 = d1 - x3 * x3 - y3 * y3 + r3 * r3;

    let ab = a3 * b2 - a2 * b3;
    if ab == 0.0 {
        // Collinear centers.
        return None;
    }
    let xa = (b2 * d3 - b3 * d2) / (ab * 2.0) - x1;
    let xb = (b3 * c2 - b2 * c3) / ab;
    let ya = (a3 * d2 - a2 * d3) / (ab * 2.0) - y1;
    let yb = (a2 * c3 - a3 * c2) / ab;

    let qa = xb * xb + yb * yb - 1.0;
    let qb = 2.0 * (r1 + xa * xb + ya * yb);
    let qc = xa * xa + ya * ya - r1 * r1;
    let r = if qa.abs() > 1e-6 {
        -(qb + (qb * qb - 4.0 * qa * qc).sqrt()) / (2.0 * qa)
    } else {
        -(qc / qb)
    };

    let e = Circle { x: x1 + xa + xb * r, y: y1 + ya + yb * r, r };
    (e.x.is_finite() && e.y.is_finite() && e.r.is_finite()).then_some(e)
}

/// Circle around the bounding box of all circles. Not minimal, always valid.
fn bounding_enclosure(circles: &[Circle]) -> Circle {
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for c in circles {
        min_x = min_x.min(c.x - c.r);
        min_y = min_y.min(c.y - c.r);
        max_x = max_x.max(c.x + c.r);
        max_y = max_y.max(c.y + c.r);
    }
    cover(
        Circle { x: (min_x + max_x) / 2.0, y: (min_y + max_y) / 2.0, r: 0.0 },
        circles,
    )
}

/// Grow `e` until it contains every circle.
fn cover(mut e: Circle, circles: &[Circle]) -> Circle {
    for c in circles {
        let reach = ((c.x - e.x).powi(2) + (c.y - e.y).powi(2)).sqrt() + c.r;
        if reach > e.r {
            e.r = reach;
        }
    }
    e
}
