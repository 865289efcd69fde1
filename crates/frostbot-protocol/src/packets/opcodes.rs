//! 3.3.5a opcode numbers used by the engine and its built-in profiles.

pub const CMSG_CHAR_ENUM: u32 = 0x037;
pub const SMSG_CHAR_ENUM: u32 = 0x03B;
pub const CMSG_PLAYER_LOGIN: u32 = 0x03D;
pub const SMSG_UPDATE_OBJECT: u32 = 0x0A9;
pub const SMSG_AUTH_CHALLENGE: u32 = 0x1EC;
pub const CMSG_AUTH_SESSION: u32 = 0x1ED;
pub const SMSG_AUTH_RESPONSE: u32 = 0x1EE;
pub const SMSG_COMPRESSED_UPDATE_OBJECT: u32 = 0x1F6;
pub const CMSG_SET_ACTIVE_MOVER: u32 = 0x26A;

pub const MSG_MOVE_START_FORWARD: u32 = 0x0B5;
pub const MSG_MOVE_START_BACKWARD: u32 = 0x0B6;
pub const MSG_MOVE_STOP: u32 = 0x0B7;
pub const MSG_MOVE_START_STRAFE_LEFT: u32 = 0x0B8;
pub const MSG_MOVE_START_STRAFE_RIGHT: u32 = 0x0B9;
pub const MSG_MOVE_STOP_STRAFE: u32 = 0x0BA;
pub const MSG_MOVE_JUMP: u32 = 0x0BB;
pub const MSG_MOVE_START_TURN_LEFT: u32 = 0x0BC;
pub const MSG_MOVE_START_TURN_RIGHT: u32 = 0x0BD;
pub const MSG_MOVE_STOP_TURN: u32 = 0x0BE;
pub const MSG_MOVE_START_PITCH_UP: u32 = 0x0BF;
pub const MSG_MOVE_START_PITCH_DOWN: u32 = 0x0C0;
pub const MSG_MOVE_STOP_PITCH: u32 = 0x0C1;
pub const MSG_MOVE_SET_RUN_MODE: u32 = 0x0C2;
pub const MSG_MOVE_SET_WALK_MODE: u32 = 0x0C3;
pub const MSG_MOVE_FALL_LAND: u32 = 0x0C9;
pub const MSG_MOVE_START_SWIM: u32 = 0x0CA;
pub const MSG_MOVE_STOP_SWIM: u32 = 0x0CB;
pub const MSG_MOVE_SET_FACING: u32 = 0x0DA;
pub const MSG_MOVE_SET_PITCH: u32 = 0x0DB;
pub const MSG_MOVE_HEARTBEAT: u32 = 0x0EE;
pub const MSG_MOVE_START_ASCEND: u32 = 0x359;
pub const MSG_MOVE_STOP_ASCEND: u32 = 0x35A;
pub const MSG_MOVE_START_DESCEND: u32 = 0x3A7;

/// Every opcode whose payload is a [`MovementInfo`](super::movement::MovementInfo).
pub const MOVEMENT_OPCODES: [u32; 24] = [
    MSG_MOVE_START_FORWARD,
    MSG_MOVE_START_BACKWARD,
    MSG_MOVE_STOP,
    MSG_MOVE_START_STRAFE_LEFT,
    MSG_MOVE_START_STRAFE_RIGHT,
    MSG_MOVE_STOP_STRAFE,
    MSG_MOVE_JUMP,
    MSG_MOVE_START_TURN_LEFT,
    MSG_MOVE_START_TURN_RIGHT,
    MSG_MOVE_STOP_TURN,
    MSG_MOVE_START_PITCH_UP,
    MSG_MOVE_START_PITCH_DOWN,
    MSG_MOVE_STOP_PITCH,
    MSG_MOVE_SET_RUN_MODE,
    MSG_MOVE_SET_WALK_MODE,
    MSG_MOVE_FALL_LAND,
    MSG_MOVE_START_SWIM,
    MSG_MOVE_STOP_SWIM,
    MSG_MOVE_SET_FACING,
    MSG_MOVE_SET_PITCH,
    MSG_MOVE_HEARTBEAT,
    MSG_MOVE_START_ASCEND,
    MSG_MOVE_STOP_ASCEND,
    MSG_MOVE_START_DESCEND,
];

/// Name of a known opcode, for logs.
pub fn name(opcode: u32) -> Option<&'static str> {
    Some(match opcode {
        CMSG_CHAR_ENUM => "CMSG_CHAR_ENUM",
        SMSG_CHAR_ENUM => "SMSG_CHAR_ENUM",
        CMSG_PLAYER_LOGIN => "CMSG_PLAYER_LOGIN",
        SMSG_UPDATE_OBJECT => "SMSG_UPDATE_OBJECT",
        SMSG_AUTH_CHALLENGE => "SMSG_AUTH_CHALLENGE",
        CMSG_AUTH_SESSION => "CMSG_AUTH_SESSION",
        SMSG_AUTH_RESPONSE => "SMSG_AUTH_RESPONSE",
        SMSG_COMPRESSED_UPDATE_OBJECT => "SMSG_COMPRESSED_UPDATE_OBJECT",
        CMSG_SET_ACTIVE_MOVER => "CMSG_SET_ACTIVE_MOVER",
        MSG_MOVE_HEARTBEAT => "MSG_MOVE_HEARTBEAT",
        op if MOVEMENT_OPCODES.contains(&op) => "MSG_MOVE_*",
        _ => return None,
    })
}

pub fn is_movement(opcode: u32) -> bool {
    MOVEMENT_OPCODES.contains(&opcode)
}
