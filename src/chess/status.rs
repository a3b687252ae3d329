use super::piece::Side;

/// terminal classification of a position. Ongoing means the side
/// to move still has a legal reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum GameStatus {
    Ongoing,
    WhiteWins,
    BlackWins,
    DrawStalemate,
    DrawInsufficientMaterial,
    DrawFiftyMove,
    DrawRepetition,
}

impl GameStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Ongoing)
    }
    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            Self::DrawStalemate
                | Self::DrawInsufficientMaterial
                | Self::DrawFiftyMove
                | Self::DrawRepetition
        )
    }
    pub fn winner(&self) -> Option<Side> {
        match self {
            Self::WhiteWins => Some(Side::White),
            Self::BlackWins => Some(Side::Black),
            _ => None,
        }
    }
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ongoing => write!(f, "ongoing"),
            Self::WhiteWins => write!(f, "white wins"),
            Self::BlackWins => write!(f, "black wins"),
            Self::DrawStalemate => write!(f, "stalemate"),
            Self::DrawInsufficientMaterial => write!(f, "insufficient material"),
            Self::DrawFiftyMove => write!(f, "fifty move rule"),
            Self::DrawRepetition => write!(f, "threefold repetition"),
        }
    }
}
