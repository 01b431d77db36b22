// Front-chain sibling packing.
//
// Circles are placed one at a time, each tangent to two circles on the
// current outer boundary (the front chain). A candidate that intersects the
// chain shrinks the chain and is retried. The chain is a doubly linked ring
// stored as index arrays.
//
// Positions are written relative to the enclosing circle's center.

use super::Circle;
use super::enclose::enclose;

/// Place `circles` without overlap and return the enclosing radius.
/// Input order decides placement order.
pub fn pack_siblings(circles: &mut [Circle]) -> f64 {
    let n = circles.len();
    if n == 0 {
        return 0.0;
    }

    circles[0].x = 0.0;
    circles[0].y = 0.0;
    if n == 1 {
        return circles[0].r;
    }

    circles[0].x = -circles[1].r;
    circles[1].x = circles[0].r;
    circles[1].y = 0.0;
    if n == 2 {
        return circles[0].r + circles[1].r;
    }

    circles[2] = place(circles[1], circles[0], circles[2]);

    let mut next = vec![0usize; n];
    let mut prev = vec![0usize; n];
    let (mut a, mut b) = (0usize, 1usize);
    // Ring a -> b -> c -> a.
    next[0] = 1;
    prev[1] = 0;
    next[1] = 2;
    prev[2] = 1;
    next[2] = 0;
    prev[0] = 2;

    let mut i = 3;
    'pack: while i < n {
        circles[i] = place(circles[a], circles[b], circles[i]);
        let c = i;

        // Walk the chain from both ends toward each other, nearest first.
        let (mut j, mut k) = (next[b], prev[a]);
        let (mut sj, mut sk) = (circles[b].r, circles[a].r);
        loop {
            if sj <= sk {
                if intersects(&circles[j], &circles[c]) {
                    b = j;
                    next[a] = b;
                    prev[b] = a;
                    continue 'pack;
                }
                sj += circles[j].r;
                j = next[j];
            } else {
                if intersects(&circles[k], &circles[c]) {
                    a = k;
                    next[a] = b;
                    prev[b] = a;
                    continue 'pack;
                }
                sk += circles[k].r;
                k = prev[k];
            }
            if j == next[k] {
                break;
            }
        }

        // Insert c between a and b.
        prev[c] = a;
        next[c] = b;
        next[a] = c;
        prev[b] = c;
        b = c;

        // Move the insertion point to the chain pair closest to the origin.
        let mut best = score(&circles, &next, a);
        let mut cursor = next[c];
        while cursor != b {
            let s = score(&circles, &next, cursor);
            if s < best {
                a = cursor;
                best = s;
            }
            cursor = next[cursor];
        }
        b = next[a];
        i += 1;
    }

    let e = enclose(circles);
    for circle in circles.iter_mut() {
        circle.x -= e.x;
        circle.y -= e.y;
    }
    e.r
}

/// Position `c` tangent to both `b` and `a`.
fn place(b: Circle, a: Circle, mut c: Circle) -> Circle {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let d2 = dx * dx + dy * dy;
    if d2 > 0.0 {
        let a2 = (a.r + c.r).powi(2);
        let b2 = (b.r + c.r).powi(2);
        if a2 > b2 {
            let x = (d2 + b2 - a2) / (2.0 * d2);
            let y = (b2 / d2 - x * x).max(0.0).sqrt();
            c.x = b.x - x * dx - y * dy;
            c.y = b.y - x * dy + y * dx;
        } else {
            let x = (d2 + a2 - b2) / (2.0 * d2);
            let y = (a2 / d2 - x * x).max(0.0).sqrt();
            c.x = a.x + x * dx - y * dy;
            c.y = a.y + x * dy + y * dx;
        }
    } else {
        c.x = a.x + c.r;
        c.y = a.y;
    }
    c
}

fn intersects(a: &Circle, b: &Circle) -> bool {
    let dr = a.r + b.r - 1e-6;
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dr > 0.0 && dr * dr > dx * dx + dy * dy
}

/// Squared distance from the origin to the weighted midpoint of `node` and its successor.
fn score(circles: &[Circle], next: &[usize], node: usize) -> f64 {
    let a = circles[node];
    let b = circles[next[node]];
    let ab = a.r + b.r;
    let dx = (a.x * b.r + b.x * a.r) / ab;
    let dy = (a.y * b.r + b.y * a.r) / ab;
    dx * dx + dy * dy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_circles(radii: &[f64]) -> Vec<Circle> {
        radii.iter().map(|&r| Circle { x: 0.0, y: 0.0, r }).collect()
    }

    fn assert_packed(circles: &[Circle], radius: f64) {
        for (i, a) in circles.iter().enumerate() {
            let d = (a.x * a.x + a.y * a.y).sqrt();
            assert!(d + a.r <= radius + 1e-6, "circle {i} escapes enclosure");
            for b in &circles[i + 1..] {
                let gap = ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt();
                assert!(gap >= a.r + b.r - 1e-6, "circles overlap");
            }
        }
    }

    #[test]
    fn test_trivial_sizes() {
        assert_eq!(pack_siblings(&mut []), 0.0);

        let mut one = make_circles(&[4.0]);
        assert_eq!(pack_siblings(&mut one), 4.0);
        assert_eq!((one[0].x, one[0].y), (0.0, 0.0));

        let mut two = make_circles(&[3.0, 1.0]);
        assert_eq!(pack_siblings(&mut two), 4.0);
        assert_packed(&two, 4.0 + 1e-9);
    }

    #[test]
    fn test_equal_circles_do_not_overlap() {
        let mut circles = make_circles(&[1.0; 12]);
        let r = pack_siblings(&mut circles);
        assert_packed(&circles, r);
        // A hexagonal-ish packing of 12 unit circles is well under a naive bound.
        assert!(r < 5.0);
    }

    #[test]
    fn test_mixed_radii_are_contained() {
        let radii: Vec<f64> = (1..30).map(|i| ((i * 37) % 11 + 1) as f64).collect();
        let mut circles = make_circles(&radii);
        let r = pack_siblings(&mut circles);
        assert_packed(&circles, r);
    }

    #[test]
    fn test_packing_is_deterministic() {
        let radii = [5.0, 3.0, 3.0, 2.0, 8.0, 1.0, 1.0];
        let mut first = make_circles(&radii);
        let mut second = make_circles(&radii);
        assert_eq!(pack_siblings(&mut first), pack_siblings(&mut second));
        assert_eq!(first, second);
    }
}
