//! Placement metrics and the normalized objectives shared by every strategy.

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    user::UserId,
    world::World,
};

/// Raw scores of the current placement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    /// Users whose delay is strictly above their delay SLA.
    pub sla_violations: usize,
    /// Sum of `allocation_cost[label] * demand` over every hosted service.
    pub overall_allocation_cost: u128,
    /// Data centers whose demand is strictly above their capacity.
    pub overloaded_data_centers: usize,
}

/// Dimensionless objectives of the current placement. Lower is better for all three fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// SLA violations as a percentage of the user count.
    pub sla_violation_pct: f64,
    /// Allocation cost as a percentage of the worst-case allocation cost.
    pub allocation_cost_pct: f64,
    /// Overloaded data center count. Positive values mark a constraint-violating placement.
    pub penalty: usize,
}

impl Evaluation {
    pub fn objectives(&self) -> [f64; 2] {
        [self.sla_violation_pct, self.allocation_cost_pct]
    }

    /// Sum of both objectives, used to rank candidates with equal penalty.
    pub fn combined(&self) -> f64 {
        self.sla_violation_pct + self.allocation_cost_pct
    }
}

impl World {
    /// Recomputes every user's delay and collects the raw metrics of the current placement.
    pub fn compute_metrics(&mut self) -> Result<Metrics> {
        let mut metrics = Metrics::default();

        let users = self.users.ids().collect::<Vec<UserId>>();
        for user in users {
            self.recompute_delay(user)?;
            if self.users.find_by_id(user)?.violates_sla() {
                metrics.sla_violations += 1;
            }
        }

        for data_center in self.data_centers.iter() {
            for &service in data_center.services.iter() {
                let service = self.services.find_by_id(service)?;
                let cost = data_center.cost_of(&service.label).ok_or_else(|| Error::MissingAllocationCost {
                    data_center: data_center.id,
                    label: service.label.clone(),
                })?;
                metrics.overall_allocation_cost = metrics
                    .overall_allocation_cost
                    .saturating_add(cost as u128 * service.demand as u128);
            }
            if data_center.is_overloaded() {
                metrics.overloaded_data_centers += 1;
            }
        }

        Ok(metrics)
    }

    /// Worst-case allocation cost: every data center filled to capacity with its priciest service kind.
    pub fn max_allocation_cost(&self) -> u128 {
        self.data_centers
            .iter()
            .map(|data_center| data_center.capacity as u128 * data_center.max_allocation_cost() as u128)
            .fold(0, u128::saturating_add)
    }

    /// Scores the current placement as `(sla_violation_pct, allocation_cost_pct)` plus a penalty.
    pub fn evaluate_placement(&mut self) -> Result<Evaluation> {
        let metrics = self.compute_metrics()?;
        Ok(self.evaluation_of(&metrics))
    }

    pub fn evaluation_of(&self, metrics: &Metrics) -> Evaluation {
        let users = self.users.count();
        let sla_violation_pct = if users == 0 {
            0.
        } else {
            metrics.sla_violations as f64 / users as f64 * 100.
        };

        let max_cost = self.max_allocation_cost();
        let allocation_cost_pct = if max_cost == 0 {
            0.
        } else {
            metrics.overall_allocation_cost as f64 / max_cost as f64 * 100.
        };

        Evaluation {
            sla_violation_pct,
            allocation_cost_pct,
            penalty: metrics.overloaded_data_centers,
        }
    }
}

/// Min-max normalization: `(x - min) / (max - min)`, or `1` when `min == max`.
pub fn min_max_norm(x: f64, min: f64, max: f64) -> f64 {
    if min == max {
        return 1.;
    }
    (x - min) / (max - min)
}

/// Running minimum and maximum of a stream of scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    /// Bounds of `values`, or `None` when there are none.
    pub fn of(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        values.into_iter().fold(None, |bounds, x| match bounds {
            None => Some(Bounds { min: x, max: x }),
            Some(Bounds { min, max }) => Some(Bounds {
                min: min.min(x),
                max: max.max(x),
            }),
        })
    }

    pub fn normalize(&self, x: f64) -> f64 {
        min_max_norm(x, self.min, self.max)
    }
}
