use std::{
    cmp::Ordering,
    fmt,
    str::FromStr,
};

use crate::views::PoolView;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortField {
    #[default]
    Pid,
    StakedTvl,
    Apr,
    EndTime,
    MyDeposit,
    MyReward,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Pid => "pid",
            SortField::StakedTvl => "staked_tvl",
            SortField::Apr => "apr",
            SortField::EndTime => "end_time",
            SortField::MyDeposit => "my_deposit",
            SortField::MyReward => "reward",
        }
    }
}

impl FromStr for SortField {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pid" => Ok(SortField::Pid),
            "staked_tvl" => Ok(SortField::StakedTvl),
            "apr" => Ok(SortField::Apr),
            "end_time" => Ok(SortField::EndTime),
            "my_deposit" => Ok(SortField::MyDeposit),
            "reward" => Ok(SortField::MyReward),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn flip(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl FromStr for SortDirection {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current sort of a farm's pool table. Defaults to pid, descending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SortState {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortState {
    /// Column header click: a new field starts descending, the same field flips.
    pub fn toggle(&mut self, field: SortField) {
        if self.field == field {
            self.direction = self.direction.flip();
        } else {
            self.field = field;
            self.direction = SortDirection::Desc;
        }
    }

    /// Ascending order of `field`; ties on deposit fall back to APR, highest first.
    fn compare_ascending(&self, a: &PoolView, b: &PoolView) -> Ordering {
        let by = |x: f64, y: f64| x.total_cmp(&y);
        match self.field {
            SortField::Pid => a.pid.cmp(&b.pid),
            SortField::StakedTvl => by(a.staked_tvl, b.staked_tvl),
            SortField::Apr => by(a.apr(), b.apr()),
            SortField::EndTime => a.end.cmp(&b.end),
            SortField::MyDeposit => by(a.deposited_usd, b.deposited_usd),
            SortField::MyReward => by(a.reward_usd, b.reward_usd),
        }
    }

    pub fn compare(&self, a: &PoolView, b: &PoolView) -> Ordering {
        let primary = match self.direction {
            SortDirection::Asc => self.compare_ascending(a, b),
            SortDirection::Desc => self.compare_ascending(b, a),
        };
        if self.field == SortField::MyDeposit {
            primary.then_with(|| b.apr().total_cmp(&a.apr()))
        } else {
            primary
        }
    }

    /// Stable sort; equal rows keep their input order.
    pub fn sort(&self, pools: &mut [PoolView]) {
        pools.sort_by(|a, b| self.compare(a, b));
    }
}
