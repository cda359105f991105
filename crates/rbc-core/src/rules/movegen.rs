//! Pseudo-legal move generation and move application.
//!
//! Pseudo-legal means "obeys piece movement" only: moves that leave the mover's own king
//! attacked are kept, and positions missing a king are handled like any other.

use super::attacks::{DIAGONAL, KING_STEPS, KNIGHT_STEPS, ORTHOGONAL, is_in_check};
use super::castling;
use super::RulesError;
use crate::model::{CastleSide, Color, Move, Piece, PieceKind, Position, Square};

pub(crate) fn pseudo_legal(position: &Position) -> Vec<Move> {
    let us = position.turn();
    let mut moves = Vec::with_capacity(64);
    for (from, piece) in position.pieces_of(us) {
        match piece.kind {
            PieceKind::Pawn => pawn_moves(position, from, us, &mut moves),
            PieceKind::Knight => step_moves(position, from, us, &KNIGHT_STEPS, &mut moves),
            PieceKind::King => step_moves(position, from, us, &KING_STEPS, &mut moves),
            PieceKind::Bishop => slide_moves(position, from, us, &DIAGONAL, &mut moves),
            PieceKind::Rook => slide_moves(position, from, us, &ORTHOGONAL, &mut moves),
            PieceKind::Queen => {
                slide_moves(position, from, us, &ORTHOGONAL, &mut moves);
                slide_moves(position, from, us, &DIAGONAL, &mut moves);
            }
        }
    }
    moves.extend(castling::standard_castles(position));
    moves
}

/// Pseudo-legal moves that do not leave any king of the mover attacked.
pub(crate) fn legal(position: &Position) -> Vec<Move> {
    let us = position.turn();
    pseudo_legal(position)
        .into_iter()
        .filter(|mv| match apply(position, *mv) {
            Ok(next) => !is_in_check(&next, us),
            Err(_) => false,
        })
        .collect()
}

fn pawn_moves(position: &Position, from: Square, us: Color, moves: &mut Vec<Move>) {
    let dir = us.pawn_direction();
    let start_rank = match us {
        Color::White => 1,
        Color::Black => 6,
    };

    if let Some(one) = from.offset(0, dir) {
        if !position.is_occupied(one) {
            push_pawn_move(from, one, moves);
            if from.rank() == start_rank {
                if let Some(two) = from.offset(0, 2 * dir) {
                    if !position.is_occupied(two) {
                        moves.push(Move::new(from, two));
                    }
                }
            }
        }
    }

    for df in [-1i8, 1] {
        let Some(target) = from.offset(df, dir) else {
            continue;
        };
        let enemy_there = position.piece_at(target).is_some_and(|p| p.color != us);
        if enemy_there || position.en_passant() == Some(target) {
            push_pawn_move(from, target, moves);
        }
    }
}

fn push_pawn_move(from: Square, to: Square, moves: &mut Vec<Move>) {
    if to.rank() == 0 || to.rank() == 7 {
        for kind in PieceKind::PROMOTIONS {
            moves.push(Move::with_promotion(from, to, kind));
        }
    } else {
        moves.push(Move::new(from, to));
    }
}

fn step_moves(
    position: &Position,
    from: Square,
    us: Color,
    steps: &[(i8, i8)],
    moves: &mut Vec<Move>,
) {
    for &(df, dr) in steps {
        if let Some(to) = from.offset(df, dr) {
            if position.piece_at(to).is_none_or(|p| p.color != us) {
                moves.push(Move::new(from, to));
            }
        }
    }
}

fn slide_moves(
    position: &Position,
    from: Square,
    us: Color,
    directions: &[(i8, i8)],
    moves: &mut Vec<Move>,
) {
    for &(df, dr) in directions {
        let mut cursor = from.offset(df, dr);
        while let Some(to) = cursor {
            match position.piece_at(to) {
                None => moves.push(Move::new(from, to)),
                Some(piece) => {
                    if piece.color != us {
                        moves.push(Move::new(from, to));
                    }
                    break;
                }
            }
            cursor = to.offset(df, dr);
        }
    }
}

/// True when `mv` is a pawn capturing onto the en-passant square.
pub(crate) fn is_en_passant(position: &Position, mv: Move) -> bool {
    position.en_passant() == Some(mv.to)
        && mv.from.file() != mv.to.file()
        && !position.is_occupied(mv.to)
        && position
            .piece_at(mv.from)
            .is_some_and(|p| p.kind == PieceKind::Pawn)
}

/// True when `mv` is a king's two-square step from its home square.
pub(crate) fn castle_side(position: &Position, mv: Move) -> Option<CastleSide> {
    let piece = position.piece_at(mv.from)?;
    if piece.kind != PieceKind::King {
        return None;
    }
    CastleSide::from_king_move(piece.color, mv.from, mv.to)
}

/// Square of the piece `mv` would capture, if any.
pub(crate) fn capture_square(position: &Position, mv: Move) -> Option<Square> {
    if mv.is_null() {
        return None;
    }
    if is_en_passant(position, mv) {
        let mover = position.piece_at(mv.from)?.color;
        return mv.to.offset(0, -mover.pawn_direction());
    }
    let mover = position.piece_at(mv.from)?.color;
    position
        .piece_at(mv.to)
        .filter(|target| target.color != mover)
        .map(|_| mv.to)
}

/// Plays `mv` on a copy of `position`. Clocks and castling rights follow the usual FEN
/// bookkeeping; the null move is a pass.
pub(crate) fn apply(position: &Position, mv: Move) -> Result<Position, RulesError> {
    if mv.is_null() {
        return Ok(position.pass());
    }
    let piece = position
        .piece_at(mv.from)
        .ok_or(RulesError::EmptySquare(mv.from))?;

    let mut next = position.clone();
    let captured = capture_square(position, mv);
    let en_passant = is_en_passant(position, mv);
    let castle = castle_side(position, mv);

    if let Some(square) = captured {
        next.board[square.index()] = None;
    }
    if let Some(side) = castle {
        let rook_home = side.rook_home(piece.color);
        if let Some(rook) = next.board[rook_home.index()].take() {
            next.board[side.rook_target(piece.color).index()] = Some(rook);
        }
    }

    next.board[mv.from.index()] = None;
    let landed = match (piece.kind, mv.promotion) {
        (PieceKind::Pawn, Some(kind)) => Piece::new(kind, piece.color),
        _ => piece,
    };
    next.board[mv.to.index()] = Some(landed);

    next.en_passant = None;
    if piece.kind == PieceKind::Pawn && mv.from.rank().abs_diff(mv.to.rank()) == 2 {
        next.en_passant = mv.from.offset(0, piece.color.pawn_direction());
    }

    next.castling.touch(mv.from);
    next.castling.touch(mv.to);
    if piece.kind == PieceKind::King {
        next.castling.remove_color(piece.color);
    }

    let resets_clock = piece.kind == PieceKind::Pawn || captured.is_some() || en_passant;
    next.halfmove_clock = if resets_clock {
        0
    } else {
        position.halfmove_clock().saturating_add(1)
    };
    if position.turn() == Color::Black {
        next.fullmove_number = position.fullmove_number().saturating_add(1);
    }
    next.turn = !position.turn();
    next.canonicalize();
    Ok(next)
}
