use super::Config;
use crate::approximator::Approximator;
use crate::approximator::Network;
use crate::checkpoint::CheckpointManager;
use crate::chess::Board;
use crate::chess::GameStatus;
use crate::chess::Move;
use crate::codec;
use crate::errors::ChessError;
use crate::errors::Result;
use crate::seed::SeedManager;
use rand::rngs::SmallRng;

#[derive(Debug, Clone)]
pub struct PlayReply {
    pub engine_move: Option<String>,
    pub status: GameStatus,
    pub fen: String,
}

/// single-step interactive session: the caller plays one side in
/// long algebraic notation, the engine answers greedily from the
/// loaded checkpoint
pub struct PlaySession {
    board: Board,
    network: Network,
    rng: SmallRng,
}

impl PlaySession {
    pub fn new(config: Config, checkpoint: Option<&str>) -> Result<Self> {
        config.validate()?;
        let seeds = SeedManager::new(config.master_seed);
        let learning = &config.learning;
        let mut network = Network::new(
            learning.mode,
            &learning.hidden_layers,
            learning.learning_rate,
            learning.discount,
            learning.gradient_clip_threshold,
            learning.target_update_frequency,
            &mut seeds.init_rng(),
        );
        if let Some(id) = checkpoint {
            let mut manager = CheckpointManager::new(&config.checkpointing)?;
            manager.load(id, &mut network)?;
            log::info!("playing against checkpoint {}", id);
        }
        Ok(Self {
            board: Board::new(),
            network,
            rng: seeds.derived(b"play", 0).game_rng(0),
        })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }
    pub fn status(&self) -> GameStatus {
        self.board.status()
    }

    /// apply the caller's move, then the engine's reply if the
    /// game is still running
    pub fn step(&mut self, input: &str) -> Result<PlayReply> {
        let mv = Move::try_from(input).map_err(ChessError::RulesEngine)?;
        self.board = self
            .board
            .apply(mv)
            .map_err(ChessError::RulesEngine)?;
        let mut engine_move = None;
        if !self.board.status().is_terminal() {
            let state = codec::encode_state(&self.board);
            let mask = codec::legal_mask(&self.board);
            let action = self.network.select_action(&state, &mask, 0.0, &mut self.rng);
            let reply = codec::decode_action(action, &self.board)?;
            self.board = self.board.apply(reply).map_err(ChessError::RulesEngine)?;
            engine_move = Some(reply.to_string());
        }
        Ok(PlayReply {
            engine_move,
            status: self.board.status(),
            fen: self.board.fen(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> PlaySession {
        let mut config = Config::new();
        config.learning.hidden_layers = vec![8];
        PlaySession::new(config, None).unwrap()
    }

    #[test]
    fn engine_answers_a_legal_move() {
        let mut session = session();
        let reply = session.step("e2e4").unwrap();
        assert!(reply.engine_move.is_some());
        assert_eq!(reply.status, GameStatus::Ongoing);
        // two plies in: black replied, white to move again
        assert_eq!(session.board().side_to_move(), crate::chess::Side::White);
    }

    #[test]
    fn nonsense_is_rejected_without_advancing() {
        let mut session = session();
        assert!(session.step("e2e9").is_err());
        assert!(session.step("e7e5").is_err());
        assert_eq!(session.board().fen(), Board::new().fen());
    }
}
