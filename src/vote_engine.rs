//! Ranked preference ballots over published names
//!
//! Each voter holds at most one ballot with FIRST, SECOND and THIRD slots.
//! Filled slots always form an unbroken run from FIRST, and no player sits in
//! two slots of the same ballot. `vote_name` refuses any move that would break
//! either rule, naming the rank that would be left empty or the ranks still
//! to fill.

use std::collections::{BTreeMap, BTreeSet};
use std::convert::Infallible;

use tracing::{debug, info};

use crate::error::LedgerError;
use crate::ledger::{Ledger, PlayerRef};
use crate::outcome::{failed, Outcome, WorkflowFailure};
use crate::players::resolve_player;
use crate::types::{Player, Rank, UserId, Vote};

/// Request to place a player's name in one rank of a ballot
#[derive(Debug, Clone, Copy)]
pub struct VoteName<'a> {
    pub voter: &'a UserId,
    pub voted_player: PlayerRef<'a>,
    pub rank: Rank,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VoteNameFailure {
    VotingClosed,
    VotedPlayerNotFound,
    NameNotPublished {
        player: Player,
    },
    /// The player already holds the requested rank
    RepeatedVote {
        rank_to_voted_name: BTreeMap<Rank, String>,
    },
    /// Earlier ranks must be filled first
    OutOfOrderVote {
        rank_to_voted_name: BTreeMap<Rank, String>,
        missing_ranks: BTreeSet<Rank>,
    },
    /// Moving the player would leave a gap at `rank_left_empty`
    InvalidSwitchedVote {
        rank_to_voted_name: BTreeMap<Rank, String>,
        rank_left_empty: Rank,
    },
}

impl VoteNameFailure {
    pub fn is_voting_closed(&self) -> bool {
        matches!(self, Self::VotingClosed)
    }

    pub fn is_voted_player_not_found(&self) -> bool {
        matches!(self, Self::VotedPlayerNotFound)
    }

    pub fn is_name_not_published(&self) -> bool {
        matches!(self, Self::NameNotPublished { .. })
    }

    pub fn is_repeated_vote(&self) -> bool {
        matches!(self, Self::RepeatedVote { .. })
    }

    pub fn is_out_of_order_vote(&self) -> bool {
        matches!(self, Self::OutOfOrderVote { .. })
    }

    pub fn is_invalid_switched_vote(&self) -> bool {
        matches!(self, Self::InvalidSwitchedVote { .. })
    }
}

impl WorkflowFailure for VoteNameFailure {
    fn name(&self) -> &'static str {
        match self {
            Self::VotingClosed => "votingClosed",
            Self::VotedPlayerNotFound => "votedPlayerNotFound",
            Self::NameNotPublished { .. } => "nameNotPublished",
            Self::RepeatedVote { .. } => "repeatedVote",
            Self::OutOfOrderVote { .. } => "outOfOrderVote",
            Self::InvalidSwitchedVote { .. } => "invalidSwitchedVote",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoteNameSuccess {
    /// The ballot as saved
    pub vote: Vote,
    /// Ranks still unfilled
    pub missing_ranks: BTreeSet<Rank>,
    pub rank_to_voted_name: BTreeMap<Rank, String>,
    /// The ballot without the rank just voted
    pub other_rank_to_voted_name: BTreeMap<Rank, String>,
    /// Whoever held the voted rank before this vote
    pub player_previously_in_rank: Option<Player>,
    /// Where the voted player sat before this vote
    pub previous_rank_of_player: Option<Rank>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MyVotes {
    pub rank_to_voted_name: BTreeMap<Rank, String>,
}

/// A removed ballot. Replaying `vote_name` over `rank_to_voted_player` in
/// rank order restores it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClearedVotes {
    pub rank_to_voted_player: BTreeMap<Rank, Player>,
}

/// Runs ballot workflows against a ledger
pub struct VoteEngine<'a, L: Ledger> {
    ledger: &'a mut L,
}

impl<'a, L: Ledger> VoteEngine<'a, L> {
    pub fn new(ledger: &'a mut L) -> Self {
        Self { ledger }
    }

    /// Place `voted_player` at `rank` on the voter's ballot
    ///
    /// # Arguments
    /// * `request` - The voter, the player voted for, and the rank
    ///
    /// # Returns
    /// The saved ballot with the rank it replaced and whoever was displaced,
    /// or the first failing check. The ballot is untouched on failure.
    pub fn vote_name(
        &mut self,
        request: VoteName<'_>,
    ) -> Result<Outcome<VoteNameSuccess, VoteNameFailure>, LedgerError> {
        const WORKFLOW: &str = "voteName";

        if !self.ledger.is_voting_open() {
            return Ok(failed(WORKFLOW, VoteNameFailure::VotingClosed));
        }
        let Some(voted_player) = resolve_player(&*self.ledger, request.voted_player) else {
            return Ok(failed(WORKFLOW, VoteNameFailure::VotedPlayerNotFound));
        };
        if voted_player.published_name.is_none() {
            return Ok(failed(
                WORKFLOW,
                VoteNameFailure::NameNotPublished {
                    player: voted_player,
                },
            ));
        }

        let mut vote = self
            .ledger
            .vote(request.voter)
            .unwrap_or_else(|| Vote::new(request.voter.clone()));
        let rank = request.rank;
        let previous_rank_of_player = vote.rank_of(&voted_player.id);

        if let Some(previous_rank) = previous_rank_of_player {
            if previous_rank == rank {
                return Ok(failed(
                    WORKFLOW,
                    VoteNameFailure::RepeatedVote {
                        rank_to_voted_name: self.rank_to_voted_name(&vote),
                    },
                ));
            }
            if let Some(rank_left_empty) = gap_left_by_switch(&vote, previous_rank, rank) {
                return Ok(failed(
                    WORKFLOW,
                    VoteNameFailure::InvalidSwitchedVote {
                        rank_to_voted_name: self.rank_to_voted_name(&vote),
                        rank_left_empty,
                    },
                ));
            }
        }

        let missing_ranks = unfilled_ranks_before(&vote, rank);
        if !missing_ranks.is_empty() {
            return Ok(failed(
                WORKFLOW,
                VoteNameFailure::OutOfOrderVote {
                    rank_to_voted_name: self.rank_to_voted_name(&vote),
                    missing_ranks,
                },
            ));
        }

        let player_previously_in_rank = vote
            .slot(rank)
            .and_then(|id| resolve_player(&*self.ledger, id.into()));

        if let Some(previous_rank) = previous_rank_of_player {
            vote.set_slot(previous_rank, None);
        }
        vote.set_slot(rank, Some(voted_player.id.clone()));
        self.ledger.save_vote(vote.clone())?;

        info!(
            voter = %request.voter,
            player = %voted_player.id,
            %rank,
            previous_rank = ?previous_rank_of_player,
            "Vote cast"
        );

        let rank_to_voted_name = self.rank_to_voted_name(&vote);
        let mut other_rank_to_voted_name = rank_to_voted_name.clone();
        other_rank_to_voted_name.remove(&rank);

        Ok(Outcome::Success(VoteNameSuccess {
            missing_ranks: vote.missing_ranks(),
            vote,
            rank_to_voted_name,
            other_rank_to_voted_name,
            player_previously_in_rank,
            previous_rank_of_player,
        }))
    }

    /// The voter's ballot as published names, possibly empty
    pub fn see_my_votes(&self, voter: &UserId) -> Outcome<MyVotes, Infallible> {
        let rank_to_voted_name = self
            .ledger
            .vote(voter)
            .map(|vote| self.rank_to_voted_name(&vote))
            .unwrap_or_default();
        Outcome::Success(MyVotes { rank_to_voted_name })
    }

    /// Delete the voter's ballot, returning who was in each rank
    ///
    /// # Returns
    /// Always a success. A voter without a ballot gets an empty mapping.
    pub fn clear_my_votes(&mut self, voter: &UserId) -> Outcome<ClearedVotes, Infallible> {
        let Some(vote) = self.ledger.delete_vote(voter) else {
            debug!(voter = %voter, "No ballot to clear");
            return Outcome::Success(ClearedVotes::default());
        };

        let rank_to_voted_player = vote
            .ranks()
            .into_iter()
            .filter_map(|(rank, id)| resolve_player(&*self.ledger, (&id).into()).map(|p| (rank, p)))
            .collect::<BTreeMap<_, _>>();

        info!(voter = %voter, ranks = rank_to_voted_player.len(), "Ballot cleared");
        Outcome::Success(ClearedVotes {
            rank_to_voted_player,
        })
    }

    /// Filled ranks mapped to each voted player's published name
    fn rank_to_voted_name(&self, vote: &Vote) -> BTreeMap<Rank, String> {
        vote.ranks()
            .into_iter()
            .filter_map(|(rank, id)| {
                self.ledger
                    .player(&id)
                    .and_then(|player| player.published_name)
                    .map(|name| (rank, name))
            })
            .collect()
    }
}

/// The rank a move from `from` to `to` would leave empty, if the move is refused
///
/// FIRST can never be vacated. SECOND may only move up to FIRST, and only
/// while THIRD is unfilled. THIRD can always move.
fn gap_left_by_switch(vote: &Vote, from: Rank, to: Rank) -> Option<Rank> {
    match (from, to) {
        (Rank::First, _) => Some(Rank::First),
        (Rank::Second, Rank::Third) => Some(Rank::Second),
        (Rank::Second, _) if vote.slot(Rank::Third).is_some() => Some(Rank::Second),
        _ => None,
    }
}

/// Ranks before `rank` that must be filled before it can be voted
fn unfilled_ranks_before(vote: &Vote, rank: Rank) -> BTreeSet<Rank> {
    Rank::ALL
        .iter()
        .copied()
        .filter(|earlier| *earlier < rank && vote.slot(*earlier).is_none())
        .collect()
}
