//! Algèbre d'intervalles : fusion et détection de chevauchements.
//!
//! Générique sur le type de point (instants en production, entiers dans les
//! tests). Toutes les fonctions sont pures.

use std::ops::Sub;

/// Intervalle fermé `[start, end]`, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval<T> {
    pub start: T,
    pub end: T,
}

impl<T: Ord + Copy> Interval<T> {
    /// Renvoie `None` si `end < start`.
    pub fn new(start: T, end: T) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn contains(&self, at: T) -> bool {
        self.start <= at && at <= self.end
    }

    /// Vrai si les deux intervalles se chevauchent ou se touchent.
    pub fn meets(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl<T: Copy + Sub> Interval<T> {
    pub fn duration(&self) -> T::Output {
        self.end - self.start
    }
}

impl<T> From<(T, T)> for Interval<T> {
    fn from((start, end): (T, T)) -> Self {
        Self { start, end }
    }
}

/// Fusionne les intervalles qui se chevauchent ou se touchent.
///
/// Le résultat est trié par début, sans chevauchement ni contact.
pub fn merge<T: Ord + Copy>(intervals: &[Interval<T>]) -> Vec<Interval<T>> {
    let mut sorted = intervals.to_vec();
    sorted.sort_by_key(|i| (i.start, i.end));

    let mut out: Vec<Interval<T>> = Vec::with_capacity(sorted.len());
    for iv in sorted {
        match out.last_mut() {
            Some(last) if last.meets(&iv) => {
                if iv.end > last.end {
                    last.end = iv.end;
                }
            }
            _ => out.push(iv),
        }
    }
    out
}

/// Sous-plages couvertes par au moins deux intervalles, fusionnées.
///
/// Deux intervalles qui ne font que se toucher ne comptent pas comme une
/// double réservation.
pub fn find_overlaps<T: Ord + Copy>(intervals: &[Interval<T>]) -> Vec<Interval<T>> {
    let mut sorted = intervals.to_vec();
    sorted.sort_by_key(|i| (i.start, i.end));

    let mut overlaps = Vec::new();
    // plus grande fin vue jusqu'ici
    let mut reach: Option<T> = None;
    for iv in sorted {
        if let Some(r) = reach {
            if iv.start < r {
                let end = if iv.end < r { iv.end } else { r };
                if iv.start < end {
                    overlaps.push(Interval { start: iv.start, end });
                }
            }
            if iv.end > r {
                reach = Some(iv.end);
            }
        } else {
            reach = Some(iv.end);
        }
    }
    merge(&overlaps)
}

/// Trous entre fragments consécutifs d'une liste déjà fusionnée.
pub fn holes<T: Ord + Copy>(merged: &[Interval<T>]) -> Vec<Interval<T>> {
    merged
        .windows(2)
        .map(|pair| Interval {
            start: pair[0].end,
            end: pair[1].start,
        })
        .collect()
}
