//! Cap Ledger - Per-Address and Per-Group Contribution Limits
//!
//! Every address is either capped on its own or is a member of exactly one
//! group that shares a pooled cap and a pooled running total. An address
//! with no entry has an effective cap of zero: contributions are denied
//! until the owner sets a cap.
//!
//! # Check-Then-Commit
//!
//! [`CapLedger::check`] validates a contribution without touching state and
//! returns the [`CapBucket`] it would be charged to. The caller commits that
//! bucket with [`CapLedger::commit`] once its own effects are also known to
//! succeed, so a rejected purchase never moves a counter.
//!
//! # Reassignment
//!
//! Each address also keeps its own running total, independent of the bucket
//! it is charged to. Moving an address between buckets carries that total
//! along: the old pool is debited, the new bucket starts from it. The owner
//! can therefore never hand an address a fresh budget by re-capping it.
//!
//! # Invariants
//! - A purchase is accepted only if its bucket stays at or under its cap
//! - A group pool's total equals the sum of its members' own totals
//! - Group membership always takes precedence over an individual cap
//! - All arithmetic is checked before anything is recorded

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use lib_types::{Address, Amount};
use serde::{Deserialize, Serialize};

use crate::errors::{CapScope, SaleError, SaleResult};

/// Identifier of a group pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub u64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group#{}", self.0)
    }
}

/// Per-address cap tracking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapEntry {
    Individual { cap: Amount, contributed: Amount },
    GroupMember(GroupId),
}

/// Shared limit of a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPool {
    pub cap: Amount,
    pub contributed: Amount,
    pub members: BTreeSet<Address>,
}

/// Counter a validated contribution will be charged to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapBucket {
    Individual(Address),
    Group { group: GroupId, member: Address },
}

impl CapBucket {
    /// Address the contribution is credited to
    pub fn address(&self) -> Address {
        match self {
            CapBucket::Individual(address) => *address,
            CapBucket::Group { member, .. } => *member,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapLedger {
    entries: BTreeMap<Address, CapEntry>,
    groups: BTreeMap<GroupId, GroupPool>,
    /// Lifetime total per address, whatever bucket it was charged to
    contributed_by: BTreeMap<Address, Amount>,
    next_group: u64,
}

impl CapLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Configuration ──────────────────────────────────────────────────

    /// Give `address` its own cap
    ///
    /// The individual total starts from everything the address has already
    /// contributed. A group member leaves its group and takes its share along.
    pub fn set_user_cap(&mut self, address: Address, cap: Amount) {
        if let Some(CapEntry::GroupMember(group)) = self.entries.get(&address) {
            let group = *group;
            self.leave_group(&address, group);
        }
        let contributed = self.contributed_by(&address);
        self.entries
            .insert(address, CapEntry::Individual { cap, contributed });
    }

    /// Create a new pool with `cap` and move every address in `members` into it
    ///
    /// The pool starts from the members' combined prior contributions, which
    /// may already exceed `cap`; further purchases are then rejected.
    pub fn set_group_cap(&mut self, members: &[Address], cap: Amount) -> GroupId {
        let id = GroupId(self.next_group);
        self.next_group += 1;

        let members: BTreeSet<Address> = members.iter().copied().collect();
        let mut contributed: Amount = 0;
        for member in &members {
            if let Some(CapEntry::GroupMember(previous)) = self.entries.get(member) {
                let previous = *previous;
                self.leave_group(member, previous);
            }
            contributed = contributed.saturating_add(self.contributed_by(member));
            self.entries.insert(*member, CapEntry::GroupMember(id));
        }

        self.groups.insert(
            id,
            GroupPool {
                cap,
                contributed,
                members,
            },
        );
        id
    }

    // ─── Queries ────────────────────────────────────────────────────────

    /// Effective cap: group cap if grouped, else individual cap, else zero
    pub fn get_user_cap(&self, address: &Address) -> Amount {
        self.resolve(address).map(|(cap, _, _)| cap).unwrap_or(0)
    }

    /// Running total of the bucket `address` is charged to
    pub fn get_user_contribution(&self, address: &Address) -> Amount {
        self.resolve(address)
            .map(|(_, contributed, _)| contributed)
            .unwrap_or(0)
    }

    /// Everything `address` has contributed, across all buckets
    pub fn contributed_by(&self, address: &Address) -> Amount {
        self.contributed_by.get(address).copied().unwrap_or(0)
    }

    pub fn entry(&self, address: &Address) -> Option<&CapEntry> {
        self.entries.get(address)
    }

    pub fn group(&self, id: GroupId) -> Option<&GroupPool> {
        self.groups.get(&id)
    }

    pub fn group_of(&self, address: &Address) -> Option<GroupId> {
        match self.entries.get(address) {
            Some(CapEntry::GroupMember(id)) => Some(*id),
            _ => None,
        }
    }

    // ─── Enforcement ────────────────────────────────────────────────────

    /// Validate that `value` fits under the effective cap of `address`
    pub fn check(&self, address: &Address, value: Amount) -> SaleResult<CapBucket> {
        let (cap, contributed, bucket) = match self.resolve(address) {
            Some(resolved) => resolved,
            None => (0, 0, CapBucket::Individual(*address)),
        };

        let total = contributed
            .checked_add(value)
            .ok_or(SaleError::ArithmeticOverflow)?;
        if total > cap {
            let scope = match bucket {
                CapBucket::Individual(addr) => CapScope::Individual(addr),
                CapBucket::Group { group, .. } => CapScope::Group(group),
            };
            return Err(SaleError::CapExceeded {
                scope,
                cap,
                contributed,
                attempted: value,
            });
        }
        Ok(bucket)
    }

    /// Record `value` against a bucket returned by [`check`](Self::check)
    pub fn commit(&mut self, bucket: CapBucket, value: Amount) {
        let own = self.contributed_by.entry(bucket.address()).or_insert(0);
        *own = own.saturating_add(value);

        match bucket {
            CapBucket::Individual(address) => {
                if let Some(CapEntry::Individual { contributed, .. }) =
                    self.entries.get_mut(&address)
                {
                    *contributed = contributed.saturating_add(value);
                }
            }
            CapBucket::Group { group, .. } => {
                if let Some(pool) = self.groups.get_mut(&group) {
                    pool.contributed = pool.contributed.saturating_add(value);
                }
            }
        }
    }

    /// [`check`](Self::check) and [`commit`](Self::commit) in one step
    pub fn validate_and_record(&mut self, address: &Address, value: Amount) -> SaleResult<()> {
        let bucket = self.check(address, value)?;
        self.commit(bucket, value);
        Ok(())
    }

    fn resolve(&self, address: &Address) -> Option<(Amount, Amount, CapBucket)> {
        match self.entries.get(address)? {
            CapEntry::Individual { cap, contributed } => {
                Some((*cap, *contributed, CapBucket::Individual(*address)))
            }
            CapEntry::GroupMember(id) => {
                let pool = self.groups.get(id)?;
                Some((
                    pool.cap,
                    pool.contributed,
                    CapBucket::Group {
                        group: *id,
                        member: *address,
                    },
                ))
            }
        }
    }

    fn leave_group(&mut self, address: &Address, group: GroupId) {
        let share = self.contributed_by(address);
        if let Some(pool) = self.groups.get_mut(&group) {
            pool.members.remove(address);
            pool.contributed = pool.contributed.saturating_sub(share);
        }
    }
}
