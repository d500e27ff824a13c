//! Permission-scoped signing.
//!
//! The pool wallet grants a restricted active permission to a separate
//! control key; every state-changing transaction the station issues is
//! stamped with that permission id and signed by the control key. The pool
//! owner key, if present at all, is only used as an explicit fallback.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use tron::TronWallet;
use tron::protocol::{BuiltTransaction, SignedTransaction};

/// Operations the station may need a signature for, named after the TRON
/// contract types they map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlOp {
    Transfer,
    FreezeBalanceV2,
    DelegateResource,
    UndelegateResource,
    CreateAccount,
}

impl ControlOp {
    pub const ALL: [ControlOp; 5] = [
        ControlOp::Transfer,
        ControlOp::FreezeBalanceV2,
        ControlOp::DelegateResource,
        ControlOp::UndelegateResource,
        ControlOp::CreateAccount,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ControlOp::Transfer => "transfer",
            ControlOp::FreezeBalanceV2 => "freeze_balance_v2",
            ControlOp::DelegateResource => "delegate_resource",
            ControlOp::UndelegateResource => "undelegate_resource",
            ControlOp::CreateAccount => "create_account",
        }
    }

    fn bit(self) -> u32 {
        match self {
            ControlOp::Transfer => 1 << 0,
            ControlOp::FreezeBalanceV2 => 1 << 1,
            ControlOp::DelegateResource => 1 << 2,
            ControlOp::UndelegateResource => 1 << 3,
            ControlOp::CreateAccount => 1 << 4,
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        ControlOp::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .with_context(|| format!("unknown control op {s:?}"))
    }
}

/// The allow-set of the pool's active permission, as configured out-of-band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlOps(u32);

impl ControlOps {
    pub fn from_ops(ops: &[ControlOp]) -> Self {
        Self(ops.iter().fold(0, |acc, op| acc | op.bit()))
    }

    pub fn parse_csv(csv: &str) -> Result<Self> {
        let mut bits = 0;
        for part in csv.split(',').filter(|p| !p.trim().is_empty()) {
            bits |= ControlOp::parse(part)?.bit();
        }
        Ok(Self(bits))
    }

    pub fn contains(&self, op: ControlOp) -> bool {
        self.0 & op.bit() != 0
    }

    pub fn names(&self) -> Vec<&'static str> {
        ControlOp::ALL
            .into_iter()
            .filter(|op| self.contains(*op))
            .map(ControlOp::name)
            .collect()
    }
}

/// Which keys exist and how far the station may reach past the control key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningMode {
    ControlOnly,
    ControlWithOwnerFallback,
    OwnerOnly,
}

#[derive(Debug)]
pub enum SignRefusal {
    /// The op is outside the control allow-set and owner fallback is off.
    NotAllowed(ControlOp),
    /// Key material the chosen path needs is missing.
    MissingKey(&'static str),
}

impl fmt::Display for SignRefusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignRefusal::NotAllowed(op) => write!(
                f,
                "operation {} is outside the control allow-set and owner fallback is disabled",
                op.name()
            ),
            SignRefusal::MissingKey(which) => write!(f, "no {which} key configured"),
        }
    }
}

impl std::error::Error for SignRefusal {}

/// The key and permission id a given operation must be signed with.
#[derive(Debug, Clone, Copy)]
pub struct SigningPlan<'a> {
    pub wallet: &'a TronWallet,
    /// `None` means the owner permission (id 0), which is never stamped.
    pub permission_id: Option<u8>,
}

pub struct Signer {
    mode: SigningMode,
    control: Option<TronWallet>,
    owner: Option<TronWallet>,
    permission_id: u8,
    allowed: ControlOps,
}

impl Signer {
    pub fn new(
        mode: SigningMode,
        control: Option<TronWallet>,
        owner: Option<TronWallet>,
        permission_id: u8,
        allowed: ControlOps,
    ) -> Result<Self> {
        match mode {
            SigningMode::ControlOnly | SigningMode::ControlWithOwnerFallback => {
                if control.is_none() {
                    anyhow::bail!("signing mode requires a control key");
                }
            }
            SigningMode::OwnerOnly => {
                if owner.is_none() {
                    anyhow::bail!("owner-only signing mode requires the owner key");
                }
            }
        }
        if mode == SigningMode::ControlWithOwnerFallback && owner.is_none() {
            anyhow::bail!("owner fallback enabled but no owner key configured");
        }
        Ok(Self {
            mode,
            control,
            owner,
            permission_id,
            allowed,
        })
    }

    pub fn mode(&self) -> SigningMode {
        self.mode
    }

    pub fn permission_id(&self) -> u8 {
        self.permission_id
    }

    pub fn allowed_ops(&self) -> ControlOps {
        self.allowed
    }

    pub fn fallback_to_owner(&self) -> bool {
        self.mode == SigningMode::ControlWithOwnerFallback
    }

    /// Resolves the key and permission id for `op` before anything is built
    /// or broadcast, so a refused op costs zero network calls.
    pub fn plan(&self, op: ControlOp) -> Result<SigningPlan<'_>, SignRefusal> {
        match self.mode {
            SigningMode::OwnerOnly => {
                let wallet = self.owner.as_ref().ok_or(SignRefusal::MissingKey("owner"))?;
                Ok(SigningPlan {
                    wallet,
                    permission_id: None,
                })
            }
            SigningMode::ControlOnly | SigningMode::ControlWithOwnerFallback => {
                if self.allowed.contains(op) {
                    let wallet = self
                        .control
                        .as_ref()
                        .ok_or(SignRefusal::MissingKey("control"))?;
                    return Ok(SigningPlan {
                        wallet,
                        permission_id: Some(self.permission_id),
                    });
                }
                if self.mode == SigningMode::ControlWithOwnerFallback {
                    let wallet = self.owner.as_ref().ok_or(SignRefusal::MissingKey("owner"))?;
                    tracing::warn!(op = op.name(), "falling back to the owner key");
                    return Ok(SigningPlan {
                        wallet,
                        permission_id: None,
                    });
                }
                Err(SignRefusal::NotAllowed(op))
            }
        }
    }

    pub fn sign(
        &self,
        op: ControlOp,
        tx: &BuiltTransaction,
    ) -> Result<SignedTransaction, anyhow::Error> {
        let plan = self.plan(op).map_err(anyhow::Error::from)?;
        plan.wallet.sign_transaction(tx)
    }
}
