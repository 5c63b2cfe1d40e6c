//! Timed command scripts for `tlock-cli simulate`.
//!
//! Accounts are written as labels and mapped to [`AccountId::from_label`].
//! Amounts are decimal strings in whole units (`"12.5"`).

use std::collections::BTreeMap;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tlock_core::asset::MemoryAssetLedger;
use tlock_core::math::{format_wad, parse_wad};
use tlock_core::traits::{AssetLedger, Clock};
use tlock_core::types::{AccountId, AssetId, LockPosition, Role};
use tlock_pool::{CommandOutcome, PoolCommand, PoolSystem};

#[derive(Debug, Deserialize)]
pub struct Script {
    /// Clock value before the first step. Wall-clock time when omitted.
    #[serde(default)]
    pub start: Option<u64>,
    /// Label of the account that creates the pools and holds every role.
    #[serde(default = "default_owner")]
    pub owner: String,
    /// Initial balances, approved for every pool.
    #[serde(default)]
    pub fund: Vec<Funding>,
    pub steps: Vec<Step>,
}

fn default_owner() -> String {
    "owner".to_string()
}

#[derive(Debug, Deserialize)]
pub struct Funding {
    pub account: String,
    pub asset: u32,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct Step {
    /// Seconds to advance the clock before running the action.
    #[serde(default)]
    pub advance: u64,
    pub caller: String,
    pub pool: String,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Action {
    Deposit {
        amount: String,
        duration: u64,
        receiver: Option<String>,
    },
    Withdraw {
        index: usize,
        receiver: Option<String>,
    },
    ExtendLock {
        index: usize,
        additional: u64,
    },
    ExtendLockEnd {
        index: usize,
        additional: u64,
    },
    IncreaseLock {
        index: usize,
        owner: Option<String>,
        amount: String,
    },
    DistributeRewards {
        amount: String,
    },
    ClaimRewards {
        receiver: Option<String>,
    },
    SetCurve {
        points: Vec<String>,
    },
    SetCurvePoint {
        value: String,
        index: usize,
    },
    GrantRole {
        role: Role,
        account: String,
    },
}

/// Outcome of one step, ready for JSON output.
#[derive(Debug, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub at: u64,
    pub caller: String,
    pub pool: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<CommandOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccountReport {
    pub account: String,
    pub shares: String,
    pub withdrawable: String,
    pub withdrawn: String,
    pub positions: Vec<LockPosition>,
}

#[derive(Debug, Serialize)]
pub struct PoolReport {
    pub name: String,
    pub total_shares: String,
    pub curve_version: u64,
    pub accounts: Vec<AccountReport>,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub steps: Vec<StepReport>,
    pub pools: Vec<PoolReport>,
}

pub fn amount(s: &str) -> Result<u128> {
    parse_wad(s).ok_or_else(|| anyhow!("invalid amount {s:?}"))
}

/// Label book: every label seen, for readable output.
#[derive(Debug, Default)]
pub struct Labels(BTreeMap<AccountId, String>);

impl Labels {
    pub fn id(&mut self, label: &str) -> AccountId {
        let id = AccountId::from_label(label);
        self.0.entry(id).or_insert_with(|| label.to_string());
        id
    }

    pub fn name(&self, id: &AccountId) -> String {
        self.0.get(id).cloned().unwrap_or_else(|| id.to_string())
    }

    pub fn ids(&self) -> impl Iterator<Item = &AccountId> {
        self.0.keys()
    }
}

impl Action {
    /// Resolve labels and amounts into a pool command.
    pub fn to_command(&self, caller: AccountId, labels: &mut Labels) -> Result<PoolCommand> {
        let or_caller = |labels: &mut Labels, who: &Option<String>| who.as_deref().map_or(caller, |l| labels.id(l));
        Ok(match self {
            Action::Deposit {
                amount: a,
                duration,
                receiver,
            } => PoolCommand::Deposit {
                amount: amount(a)?,
                duration: *duration,
                receiver: or_caller(labels, receiver),
            },
            Action::Withdraw { index, receiver } => PoolCommand::Withdraw {
                index: *index,
                receiver: or_caller(labels, receiver),
            },
            Action::ExtendLock { index, additional } => PoolCommand::ExtendLock {
                index: *index,
                additional: *additional,
            },
            Action::ExtendLockEnd { index, additional } => PoolCommand::ExtendLockEnd {
                index: *index,
                additional: *additional,
            },
            Action::IncreaseLock {
                index,
                owner,
                amount: a,
            } => PoolCommand::IncreaseLock {
                index: *index,
                owner: or_caller(labels, owner),
                amount: amount(a)?,
            },
            Action::DistributeRewards { amount: a } => PoolCommand::DistributeRewards { amount: amount(a)? },
            Action::ClaimRewards { receiver } => PoolCommand::ClaimRewards {
                receiver: or_caller(labels, receiver),
            },
            Action::SetCurve { points } => PoolCommand::SetCurve {
                points: points.iter().map(|p| amount(p)).collect::<Result<_>>()?,
            },
            Action::SetCurvePoint { value, index } => PoolCommand::SetCurvePoint {
                value: amount(value)?,
                index: *index,
            },
            Action::GrantRole { .. } => {
                return Err(anyhow!("grant_role is not a batchable pool command"));
            }
        })
    }
}

/// Mint every funding entry and approve all pools to pull it.
pub fn fund<C: Clock>(
    system: &mut PoolSystem<MemoryAssetLedger, C>,
    funding: &[Funding],
    labels: &mut Labels,
) -> Result<()> {
    let custodies: Vec<AccountId> = system.pools().iter().map(|p| p.custody()).collect();
    for f in funding {
        let account = labels.id(&f.account);
        let asset = AssetId(f.asset);
        let value = amount(&f.amount).with_context(|| format!("funding {}", f.account))?;
        let assets = system.assets_mut();
        assets.mint(asset, &account, value)?;
        for custody in &custodies {
            assets.approve(asset, &account, custody, u128::MAX);
        }
    }
    Ok(())
}

/// Run every step in order. Failures are recorded and do not stop the run.
pub fn run<L: AssetLedger + Clone, C: Clock>(
    system: &mut PoolSystem<L, C>,
    steps: &[Step],
    labels: &mut Labels,
    advance: impl Fn(u64),
) -> Vec<StepReport> {
    steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            advance(step.advance);
            let result = run_step(system, step, labels);
            let (outcome, error) = match result {
                Ok(outcome) => (outcome, None),
                Err(e) => (None, Some(format!("{e:#}"))),
            };
            StepReport {
                step: i,
                at: system.now(),
                caller: step.caller.clone(),
                pool: step.pool.clone(),
                outcome,
                error,
            }
        })
        .collect()
}

fn run_step<L: AssetLedger + Clone, C: Clock>(
    system: &mut PoolSystem<L, C>,
    step: &Step,
    labels: &mut Labels,
) -> Result<Option<CommandOutcome>> {
    let caller = labels.id(&step.caller);
    let pool = system
        .pool_id(&step.pool)
        .with_context(|| format!("unknown pool {}", step.pool))?;
    if let Action::GrantRole { role, account } = &step.action {
        let account = labels.id(account);
        system.grant_role(&caller, pool, *role, account)?;
        return Ok(None);
    }
    let command = step.action.to_command(caller, labels)?;
    Ok(Some(system.execute(&caller, pool, command)?))
}

/// Final per-pool state for every labelled account.
pub fn report<L: AssetLedger + Clone, C: Clock>(system: &PoolSystem<L, C>, labels: &Labels) -> Vec<PoolReport> {
    system
        .pools()
        .iter()
        .map(|pool| PoolReport {
            name: pool.name().to_string(),
            total_shares: format_wad(pool.total_shares()),
            curve_version: pool.curve_store().version(),
            accounts: labels
                .ids()
                .filter(|id| pool.rewards().account(id).is_some() || pool.position_count(id) > 0)
                .map(|id| AccountReport {
                    account: labels.name(id),
                    shares: format_wad(pool.shares_of(id)),
                    withdrawable: format_wad(pool.withdrawable_rewards_of(id).unwrap_or(0)),
                    withdrawn: format_wad(pool.withdrawn_rewards_of(id)),
                    positions: pool.deposits_of(id).to_vec(),
                })
                .collect(),
        })
        .collect()
}
