//! Commission calculation business logic.
//!
//! The total service fee of a completed transaction is split in half between the agency and
//! the agent pool. The agent pool goes entirely to one agent when the same agent represents
//! both sides, or is split evenly between the listing and selling agents otherwise. No
//! rounding is applied anywhere and the property type does not influence the ratios.
//!
//! Everything in this module is pure; persisting (and memoizing) a breakdown is the caller's
//! job, see [`crate::core::transaction`].

use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Share of the total fee kept by the agency.
pub const AGENCY_RATIO: f64 = 0.5;
/// Share of the total fee forming the agent pool.
pub const AGENTS_RATIO: f64 = 0.5;
/// Share of the agent pool each agent receives when two distinct agents are involved.
pub const AGENT_SPLIT_RATIO: f64 = 0.5;
/// Percentage of the total fee reported for a single agent on both sides.
pub const SAME_AGENT_PERCENTAGE: f64 = 50.0;
/// Percentage of the total fee reported for each of two distinct agents.
pub const DIFFERENT_AGENTS_PERCENTAGE: f64 = 25.0;

/// Part an agent played in a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentRole {
    /// Agent who brought the property
    Listing,
    /// Agent who brought the buyer or tenant
    Selling,
    /// Same agent on both sides
    Both,
}

impl AgentRole {
    /// Stored and serialized name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Listing => "LISTING",
            Self::Selling => "SELLING",
            Self::Both => "BOTH",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        [Self::Listing, Self::Selling, Self::Both]
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| Error::invalid_input(format!("Unknown agent role: {s}")))
    }
}

/// Commission owed to a single agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCommission {
    /// Agent receiving the amount
    pub agent_id: String,
    /// Amount owed, in the fee's currency
    pub amount: f64,
    /// Role the agent played
    pub role: AgentRole,
    /// Share of the total service fee, as a percentage
    pub percentage: f64,
}

/// Division of a transaction's total service fee between the agency and its agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionBreakdown {
    /// Agency's share
    pub agency_amount: f64,
    /// Per-agent shares, listing agent first
    pub agents: Vec<AgentCommission>,
    /// When the breakdown was computed
    pub calculated_at: DateTime<Utc>,
}

impl CommissionBreakdown {
    /// Sum of the agency share and every agent share.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.agency_amount + self.agents.iter().map(|agent| agent.amount).sum::<f64>()
    }
}

/// Fee and agent assignment a breakdown is computed from.
///
/// Fields are optional so that incomplete records are rejected with a precise
/// [`Error::InvalidInput`] instead of being impossible to express.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommissionInput<'a> {
    /// Total service fee charged to the client
    pub total_service_fee: Option<f64>,
    /// Listing agent id
    pub listing_agent_id: Option<&'a str>,
    /// Selling agent id
    pub selling_agent_id: Option<&'a str>,
}

impl<'a> CommissionInput<'a> {
    /// Input with every field present.
    #[must_use]
    pub const fn new(
        total_service_fee: f64,
        listing_agent_id: &'a str,
        selling_agent_id: &'a str,
    ) -> Self {
        Self {
            total_service_fee: Some(total_service_fee),
            listing_agent_id: Some(listing_agent_id),
            selling_agent_id: Some(selling_agent_id),
        }
    }
}

/// Computes the commission breakdown, stamped with the current time.
pub fn calculate_commission(input: &CommissionInput<'_>) -> Result<CommissionBreakdown> {
    calculate_commission_at(input, Utc::now())
}

/// Computes the commission breakdown with an explicit `calculated_at`.
///
/// Inputs are checked in order: fee, listing agent, selling agent. The first failing check
/// decides the error.
pub fn calculate_commission_at(
    input: &CommissionInput<'_>,
    calculated_at: DateTime<Utc>,
) -> Result<CommissionBreakdown> {
    let total_fee = match input.total_service_fee {
        Some(fee) if fee.is_finite() && fee > 0.0 => fee,
        _ => {
            return Err(Error::invalid_input(
                "Transaction must have a valid totalServiceFee greater than 0",
            ));
        }
    };
    let listing_agent_id = present(input.listing_agent_id)
        .ok_or_else(|| Error::invalid_input("Transaction must have a listingAgentId"))?;
    let selling_agent_id = present(input.selling_agent_id)
        .ok_or_else(|| Error::invalid_input("Transaction must have a sellingAgentId"))?;

    let agent_portion = total_fee * AGENTS_RATIO;
    let agents = if listing_agent_id == selling_agent_id {
        vec![AgentCommission {
            agent_id: listing_agent_id.to_string(),
            amount: agent_portion,
            role: AgentRole::Both,
            percentage: SAME_AGENT_PERCENTAGE,
        }]
    } else {
        let individual_amount = agent_portion * AGENT_SPLIT_RATIO;
        vec![
            AgentCommission {
                agent_id: listing_agent_id.to_string(),
                amount: individual_amount,
                role: AgentRole::Listing,
                percentage: DIFFERENT_AGENTS_PERCENTAGE,
            },
            AgentCommission {
                agent_id: selling_agent_id.to_string(),
                amount: individual_amount,
                role: AgentRole::Selling,
                percentage: DIFFERENT_AGENTS_PERCENTAGE,
            },
        ]
    };

    Ok(CommissionBreakdown {
        agency_amount: total_fee * AGENCY_RATIO,
        agents,
        calculated_at,
    })
}

fn present(id: Option<&str>) -> Option<&str> {
    id.filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_same_agent_gets_whole_pool() {
        let breakdown = calculate_commission(&CommissionInput::new(10000.0, "a1", "a1")).unwrap();

        assert_eq!(breakdown.agency_amount, 5000.0);
        assert_eq!(breakdown.agents.len(), 1);
        assert_eq!(breakdown.agents[0].agent_id, "a1");
        assert_eq!(breakdown.agents[0].amount, 5000.0);
        assert_eq!(breakdown.agents[0].role, AgentRole::Both);
        assert_eq!(breakdown.agents[0].percentage, 50.0);
    }

    #[test]
    fn test_distinct_agents_split_pool_listing_first() {
        let breakdown = calculate_commission(&CommissionInput::new(10000.0, "l1", "s1")).unwrap();

        assert_eq!(breakdown.agency_amount, 5000.0);
        assert_eq!(breakdown.agents.len(), 2);
        assert_eq!(breakdown.agents[0].agent_id, "l1");
        assert_eq!(breakdown.agents[0].amount, 2500.0);
        assert_eq!(breakdown.agents[0].role, AgentRole::Listing);
        assert_eq!(breakdown.agents[0].percentage, 25.0);
        assert_eq!(breakdown.agents[1].agent_id, "s1");
        assert_eq!(breakdown.agents[1].amount, 2500.0);
        assert_eq!(breakdown.agents[1].role, AgentRole::Selling);
        assert_eq!(breakdown.agents[1].percentage, 25.0);
        assert_eq!(breakdown.total(), 10000.0);
    }

    #[test]
    fn test_agent_ids_compared_by_value() {
        let listing = String::from("agent-7");
        let selling = format!("agent-{}", 7);
        let breakdown =
            calculate_commission(&CommissionInput::new(2000.0, &listing, &selling)).unwrap();
        assert_eq!(breakdown.agents.len(), 1);
        assert_eq!(breakdown.agents[0].role, AgentRole::Both);
    }

    #[test]
    fn test_large_fee_is_linear() {
        let breakdown = calculate_commission(&CommissionInput::new(150_000.0, "a1", "a1")).unwrap();
        assert_eq!(breakdown.agency_amount, 75000.0);
        assert_eq!(breakdown.agents[0].amount, 75000.0);
    }

    #[test]
    fn test_fractional_fee_not_rounded() {
        let breakdown = calculate_commission(&CommissionInput::new(333.0, "l1", "s1")).unwrap();
        assert_eq!(breakdown.agency_amount, 166.5);
        assert_eq!(breakdown.agents[0].amount, 83.25);
        assert_eq!(breakdown.agents[1].amount, 83.25);
    }

    #[test]
    fn test_invalid_fee_rejected() {
        let invalid_fees = [
            Some(0.0),
            Some(-100.0),
            Some(f64::NAN),
            Some(f64::INFINITY),
            None,
        ];
        for fee in invalid_fees {
            let input = CommissionInput {
                total_service_fee: fee,
                listing_agent_id: Some("l1"),
                selling_agent_id: Some("s1"),
            };
            let err = calculate_commission(&input).unwrap_err();
            assert!(matches!(err, Error::InvalidInput { .. }), "fee {fee:?}");
            assert!(err.to_string().contains("totalServiceFee"));
        }
    }

    #[test]
    fn test_missing_agents_rejected_in_order() {
        let no_listing = CommissionInput {
            total_service_fee: Some(1000.0),
            listing_agent_id: None,
            selling_agent_id: None,
        };
        let err = calculate_commission(&no_listing).unwrap_err();
        assert!(err.to_string().contains("listingAgentId"));

        let empty_selling = CommissionInput {
            total_service_fee: Some(1000.0),
            listing_agent_id: Some("l1"),
            selling_agent_id: Some(""),
        };
        let err = calculate_commission(&empty_selling).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
        assert!(err.to_string().contains("sellingAgentId"));

        // Fee is checked before agents
        let nothing = CommissionInput {
            total_service_fee: None,
            listing_agent_id: None,
            selling_agent_id: None,
        };
        let err = calculate_commission(&nothing).unwrap_err();
        assert!(err.to_string().contains("totalServiceFee"));
    }

    #[test]
    fn test_calculation_is_deterministic() {
        let input = CommissionInput::new(12345.0, "l1", "s1");
        let first = calculate_commission(&input).unwrap();
        let second = calculate_commission(&input).unwrap();
        assert_eq!(first.agency_amount, second.agency_amount);
        assert_eq!(first.agents, second.agents);

        let at = Utc::now();
        assert_eq!(
            calculate_commission_at(&input, at).unwrap(),
            calculate_commission_at(&input, at).unwrap()
        );
    }

    #[test]
    fn test_breakdown_serializes_camel_case() {
        let at = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let input = CommissionInput::new(10000.0, "a1", "a1");
        let breakdown = calculate_commission_at(&input, at).unwrap();
        let json = serde_json::to_value(&breakdown).unwrap();

        assert_eq!(json["agencyAmount"], 5000.0);
        assert_eq!(json["agents"][0]["agentId"], "a1");
        assert_eq!(json["agents"][0]["role"], "BOTH");
        assert_eq!(json["agents"][0]["percentage"], 50.0);
        assert_eq!(json["calculatedAt"], "2024-05-01T10:00:00Z");
    }

    #[test]
    fn test_agent_role_parse() {
        assert_eq!("SELLING".parse::<AgentRole>().unwrap(), AgentRole::Selling);
        assert!("BUYER".parse::<AgentRole>().is_err());
    }
}
