//! Inelastic collision resolution by absorption.

use crate::models::Velocity2D;
use crate::nbody::Body;

/// Merges two overlapping bodies: the larger absorbs the smaller.
///
/// Mass is summed and the surviving velocity is the momentum-conserving
/// weighted average `(m₁·v₁ + m₂·v₂) / (m₁ + m₂)`. The radius grows to
/// `√(r₁² + r₂²)`, preserving combined disc area — a size heuristic, not a
/// physical law. The absorbed body is flagged for removal and left in place
/// until the stepper's sweep; force evaluation already skips flagged bodies,
/// so the stale entry is inert.
///
/// Returns the surviving slot, or `None` when the pair cannot merge (same
/// slot, or either body already flagged).
pub fn resolve_absorption(first: usize, second: usize, bodies: &mut [Body]) -> Option<usize> {
    if first == second {
        return None;
    }
    if bodies[first].marked_for_removal || bodies[second].marked_for_removal {
        return None;
    }

    let (target, absorbed) = if bodies[first].mass >= bodies[second].mass {
        (first, second)
    } else {
        (second, first)
    };

    let m1 = bodies[target].mass;
    let m2 = bodies[absorbed].mass;
    let total = m1 + m2;
    let vx = (m1 * bodies[target].velocity.x + m2 * bodies[absorbed].velocity.x) / total;
    let vy = (m1 * bodies[target].velocity.y + m2 * bodies[absorbed].velocity.y) / total;
    let r1 = bodies[target].radius;
    let r2 = bodies[absorbed].radius;

    bodies[target].velocity = Velocity2D { x: vx, y: vy };
    bodies[target].mass = total;
    bodies[target].radius = (r1 * r1 + r2 * r2).sqrt();
    bodies[absorbed].marked_for_removal = true;

    Some(target)
}

/// Normalizes raw collision candidates into a deterministic work order:
/// each pair sorted low-slot-first, the whole list sorted and deduplicated.
///
/// The parallel force walk reports each overlap from both sides; resolving
/// the canonical list serially makes merge outcomes independent of thread
/// scheduling.
pub fn canonical_pairs(raw: impl Iterator<Item = (usize, usize)>) -> Vec<(usize, usize)> {
    let mut pairs: Vec<(usize, usize)> = raw
        .map(|(a, b)| if a <= b { (a, b) } else { (b, a) })
        .collect();
    pairs.sort_unstable();
    pairs.dedup();
    pairs
}
