use super::piece::Role;
use super::square::Square;

/// a move in from-to form. promotion is Some only for pawn moves
/// onto the last rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Role>,
}

impl Move {
    pub fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }
    pub fn promote(from: Square, to: Square, role: Role) -> Self {
        Self {
            from,
            to,
            promotion: Some(role),
        }
    }
}

impl TryFrom<&str> for Move {
    type Error = String;
    /// long algebraic, e.g. "e2e4", "e7e8q"
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        if s.len() < 4 {
            return Err(format!("invalid move {}", s));
        }
        let from = Square::try_from(&s[0..2])?;
        let to = Square::try_from(&s[2..4])?;
        let promotion = match s.as_bytes().get(4).copied() {
            None => None,
            Some(b'q') => Some(Role::Queen),
            Some(b'r') => Some(Role::Rook),
            Some(b'b') => Some(Role::Bishop),
            Some(b'n') => Some(Role::Knight),
            Some(c) => return Err(format!("invalid promotion {}", c as char)),
        };
        Ok(Self {
            from,
            to,
            promotion,
        })
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        match self.promotion {
            Some(Role::Queen) => write!(f, "q"),
            Some(Role::Rook) => write!(f, "r"),
            Some(Role::Bishop) => write!(f, "b"),
            Some(Role::Knight) => write!(f, "n"),
            _ => Ok(()),
        }
    }
}
