use super::array::ArrayContainer;
use super::bitset::BitsetContainer;
use super::run::RunContainer;
use super::Container;

/// A binary set operation, shared by the container and chunk-level merges
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SetOp {
    And,
    Or,
    Xor,
    AndNot,
}

impl SetOp {
    /// Whether values only present on the left side survive
    #[inline]
    pub fn keeps_left(self) -> bool {
        matches!(self, SetOp::Or | SetOp::Xor | SetOp::AndNot)
    }

    /// Whether values only present on the right side survive
    #[inline]
    pub fn keeps_right(self) -> bool {
        matches!(self, SetOp::Or | SetOp::Xor)
    }

    /// Whether values present on both sides survive
    #[inline]
    pub fn keeps_both(self) -> bool {
        matches!(self, SetOp::And | SetOp::Or)
    }

    #[inline]
    pub fn apply_word(self, left: u64, right: u64) -> u64 {
        match self {
            SetOp::And => left & right,
            SetOp::Or => left | right,
            SetOp::Xor => left ^ right,
            SetOp::AndNot => left & !right,
        }
    }
}

impl RunContainer {
    pub fn combine(&self, other: &Self, op: SetOp) -> Self {
        match op {
            SetOp::And => self.intersect(other),
            SetOp::Or => self.union(other),
            SetOp::Xor => self.symmetric_difference(other),
            SetOp::AndNot => self.difference(other),
        }
    }
}

fn filter_by_bitset(values: &ArrayContainer, bits: &BitsetContainer, keep: bool) -> Container {
    let mut out = values.clone();
    out.retain(|v| bits.contains(v) == keep);
    Container::Array(out)
}

/// Bitset `op` a sorted set of values; cardinality is recounted
fn bitset_with_values(bits: &BitsetContainer, values: &[u16], op: SetOp) -> Container {
    let mut out = bits.clone();
    out.apply_array_lazy(values, op);
    out.recount();
    Container::Bitset(out)
}

/// Bitset `op` runs; `And` is not expressible run by run
fn bitset_with_runs(bits: &BitsetContainer, runs: &RunContainer, op: SetOp) -> Container {
    if op == SetOp::And {
        return Container::Bitset(bits.combine(&runs.to_bitset(), op));
    }
    let mut out = bits.clone();
    out.apply_runs_lazy(runs.runs(), op);
    out.recount();
    Container::Bitset(out)
}

impl Container {
    /// Computes `self op other`, choosing the result variant by serialized size
    pub fn op(&self, other: &Self, op: SetOp) -> Container {
        use Container::{Array, Bitset, Run};

        let consider_run = self.is_run() || other.is_run();
        let raw = match (self, other) {
            (Array(a), Array(b)) => Array(a.merge(b, op)),
            (Bitset(a), Bitset(b)) => Bitset(a.combine(b, op)),
            (Run(a), Run(b)) => Run(a.combine(b, op)),

            (Array(a), Bitset(b)) => match op {
                SetOp::And => filter_by_bitset(a, b, true),
                SetOp::AndNot => filter_by_bitset(a, b, false),
                SetOp::Or | SetOp::Xor => bitset_with_values(b, a.as_slice(), op),
            },
            (Bitset(a), Array(b)) => match op {
                SetOp::And => filter_by_bitset(b, a, true),
                SetOp::Or | SetOp::Xor | SetOp::AndNot => bitset_with_values(a, b.as_slice(), op),
            },

            (Array(a), Run(b)) => match op {
                SetOp::And => Array(ArrayContainer::from_sorted_unchecked(
                    b.filter_values(a.as_slice(), true),
                )),
                SetOp::AndNot => Array(ArrayContainer::from_sorted_unchecked(
                    b.filter_values(a.as_slice(), false),
                )),
                SetOp::Or | SetOp::Xor => Run(a.to_run().combine(b, op)),
            },
            (Run(a), Array(b)) => match op {
                SetOp::And => Array(ArrayContainer::from_sorted_unchecked(
                    a.filter_values(b.as_slice(), true),
                )),
                SetOp::Or | SetOp::Xor | SetOp::AndNot => Run(a.combine(&b.to_run(), op)),
            },

            (Bitset(a), Run(b)) => bitset_with_runs(a, b, op),
            (Run(a), Bitset(b)) => match op {
                SetOp::AndNot => Bitset(a.to_bitset().combine(b, op)),
                SetOp::And | SetOp::Or | SetOp::Xor => bitset_with_runs(b, a, op),
            },
        };
        raw.normalize(consider_run)
    }

    /// In-place form of [`op`](Self::op)
    pub fn op_inplace(&mut self, other: &Self, op: SetOp) {
        let handled = match (&mut *self, other) {
            (Container::Bitset(a), Container::Bitset(b)) => {
                a.apply_lazy(b, op);
                a.recount();
                true
            }
            (Container::Bitset(a), Container::Array(b)) if op != SetOp::And => {
                a.apply_array_lazy(b.as_slice(), op);
                a.recount();
                true
            }
            (Container::Array(a), Container::Array(b)) if op == SetOp::AndNot => {
                let mut right = b.iter().peekable();
                a.retain(|v| {
                    while right.next_if(|&r| r < v).is_some() {}
                    right.peek() != Some(&v)
                });
                true
            }
            _ => false,
        };
        if handled {
            *self = std::mem::take(self).normalize(other.is_run());
        } else {
            *self = self.op(other, op);
        }
    }

    /// Or/Xor without recounting bitsets; call [`repair`](Self::repair) after
    pub fn lazy_op_inplace(&mut self, other: &Self, op: SetOp, force_bitsets: bool) {
        debug_assert!(matches!(op, SetOp::Or | SetOp::Xor));
        if !self.is_bitset() && (force_bitsets || other.is_bitset()) {
            *self = Container::Bitset(self.to_bitset());
        }
        let handled = match (&mut *self, other) {
            (Container::Bitset(a), Container::Bitset(b)) => {
                a.apply_lazy(b, op);
                true
            }
            (Container::Bitset(a), Container::Array(b)) => {
                a.apply_array_lazy(b.as_slice(), op);
                true
            }
            (Container::Bitset(a), Container::Run(b)) => {
                a.apply_runs_lazy(b.runs(), op);
                true
            }
            _ => false,
        };
        if !handled {
            *self = self.op(other, op);
        }
    }
}
