#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn flip(&self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }
    /// pawn push direction as a rank delta
    pub fn forward(&self) -> i8 {
        match self {
            Self::White => 1,
            Self::Black => -1,
        }
    }
    pub fn back_rank(&self) -> u8 {
        match self {
            Self::White => 0,
            Self::Black => 7,
        }
    }
    pub fn promotion_rank(&self) -> u8 {
        match self {
            Self::White => 7,
            Self::Black => 0,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::White => write!(f, "white"),
            Self::Black => write!(f, "black"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl Role {
    pub const fn all() -> &'static [Self] {
        &[
            Self::Pawn,
            Self::Knight,
            Self::Bishop,
            Self::Rook,
            Self::Queen,
            Self::King,
        ]
    }
    /// conventional centipawn-free material scale
    pub fn value(&self) -> f32 {
        match self {
            Self::Pawn => 1.,
            Self::Knight => 3.,
            Self::Bishop => 3.,
            Self::Rook => 5.,
            Self::Queen => 9.,
            Self::King => 0.,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub side: Side,
    pub role: Role,
}

impl Piece {
    pub fn new(side: Side, role: Role) -> Self {
        Self { side, role }
    }
    /// feature plane index, white pawn first, black king last
    pub fn plane(&self) -> usize {
        let role = match self.role {
            Role::Pawn => 0,
            Role::Knight => 1,
            Role::Bishop => 2,
            Role::Rook => 3,
            Role::Queen => 4,
            Role::King => 5,
        };
        match self.side {
            Side::White => role,
            Side::Black => role + 6,
        }
    }
}

impl TryFrom<char> for Piece {
    type Error = String;
    fn try_from(c: char) -> Result<Self, Self::Error> {
        let side = if c.is_ascii_uppercase() {
            Side::White
        } else {
            Side::Black
        };
        let role = match c.to_ascii_lowercase() {
            'p' => Role::Pawn,
            'n' => Role::Knight,
            'b' => Role::Bishop,
            'r' => Role::Rook,
            'q' => Role::Queen,
            'k' => Role::King,
            _ => return Err(format!("invalid piece char {}", c)),
        };
        Ok(Self::new(side, role))
    }
}

impl From<Piece> for char {
    fn from(p: Piece) -> char {
        let c = match p.role {
            Role::Pawn => 'p',
            Role::Knight => 'n',
            Role::Bishop => 'b',
            Role::Rook => 'r',
            Role::Queen => 'q',
            Role::King => 'k',
        };
        match p.side {
            Side::White => c.to_ascii_uppercase(),
            Side::Black => c,
        }
    }
}
