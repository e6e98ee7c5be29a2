//! Round-trip tests for the wire codec through its public API.
//!
//! Every typed instruction the server can emit is encoded to its text form,
//! pushed through the streaming [`Decoder`] as a viewer would receive it, and
//! decoded back to the typed form.  A handful of byte-exactness checks pin
//! the frames the join replay depends on, so a codec regression shows up as
//! a readable string diff rather than a downstream rendering bug.

use easel_core::protocol::instructions::{composite, line};
use easel_core::{decode_instruction, encode_instruction, Decoder, Frame, Instruction};

/// Encodes, re-parses, and type-decodes one instruction.
fn roundtrip(instruction: &Instruction) -> Instruction {
    let encoded = encode_instruction(instruction);
    let mut decoder = Decoder::new();
    decoder.feed(encoded.as_bytes());
    let frame = decoder
        .next_frame()
        .expect("encoded frame must parse")
        .expect("encoded frame must be complete");
    assert_eq!(
        decoder.next_frame().expect("no trailing garbage"),
        None,
        "encoding must consume exactly one frame"
    );
    decode_instruction(&frame).expect("typed decode must succeed")
}

#[test]
fn test_every_emitted_instruction_round_trips() {
    let instructions = vec![
        Instruction::Args {
            names: vec!["VERSION_1_1_0".to_string()],
        },
        Instruction::Size {
            layer: 0,
            width: 1024,
            height: 768,
        },
        Instruction::Rect {
            layer: -1,
            x: 32,
            y: 32,
            width: 32,
            height: 32,
        },
        Instruction::Cfill {
            mode: composite::OVER,
            layer: -1,
            red: 0xDD,
            green: 0xDD,
            blue: 0xDD,
            alpha: 0xFF,
        },
        Instruction::Lfill {
            mode: composite::OVER,
            layer: 0,
            source: -1,
        },
        Instruction::Arc {
            layer: 1,
            x: 64,
            y: 64,
            radius: 62,
            start: 0.0,
            end: 6.28,
            negative: false,
        },
        Instruction::Close { layer: 1 },
        Instruction::Cstroke {
            mode: composite::OVER,
            layer: 1,
            cap: line::CAP_ROUND,
            join: line::JOIN_ROUND,
            thickness: 4,
            red: 0,
            green: 0,
            blue: 0,
            alpha: 0xFF,
        },
        Instruction::Move {
            layer: 1,
            parent: 0,
            x: 200,
            y: 150,
            z: 0,
        },
        Instruction::Sync {
            timestamp: 1_700_000_000_123,
        },
        Instruction::Ready {
            connection_id: "$6a1cbb2e-17a5-46c2-9420-d9d7c2c0a6ba".to_string(),
        },
        Instruction::Disconnect,
    ];

    for instruction in &instructions {
        assert_eq!(&roundtrip(instruction), instruction);
    }
}

#[test]
fn test_root_size_frame_is_byte_exact() {
    let ins = Instruction::Size {
        layer: 0,
        width: 1024,
        height: 768,
    };
    assert_eq!(encode_instruction(&ins), "4.size,1.0,4.1024,3.768;");
}

#[test]
fn test_move_frame_is_byte_exact() {
    let ins = Instruction::Move {
        layer: 1,
        parent: 0,
        x: 200,
        y: 150,
        z: 0,
    };
    assert_eq!(encode_instruction(&ins), "4.move,1.1,1.0,3.200,3.150,1.0;");
}

#[test]
fn test_checkerboard_fill_frame_is_byte_exact() {
    let ins = Instruction::Cfill {
        mode: composite::OVER,
        layer: -1,
        red: 0x88,
        green: 0x88,
        blue: 0x88,
        alpha: 0xFF,
    };
    // Color channels travel as decimal: 0x88 = 136, 0xFF = 255, OVER = 14.
    assert_eq!(
        encode_instruction(&ins),
        "5.cfill,2.14,2.-1,3.136,3.136,3.136,3.255;"
    );
}

#[test]
fn test_sync_frame_is_byte_exact() {
    let ins = Instruction::Sync { timestamp: 42 };
    assert_eq!(encode_instruction(&ins), "4.sync,2.42;");
}

#[test]
fn test_decoder_survives_one_byte_at_a_time_delivery() {
    let encoded = encode_instruction(&Instruction::Cstroke {
        mode: composite::OVER,
        layer: 1,
        cap: line::CAP_ROUND,
        join: line::JOIN_ROUND,
        thickness: 4,
        red: 0,
        green: 0,
        blue: 0,
        alpha: 255,
    });

    let mut decoder = Decoder::new();
    let mut frames: Vec<Frame> = Vec::new();
    for byte in encoded.as_bytes() {
        decoder.feed(std::slice::from_ref(byte));
        if let Some(frame) = decoder.next_frame().expect("parse") {
            frames.push(frame);
        }
    }
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].opcode, "cstroke");
}

#[test]
fn test_viewer_handshake_frames_parse_as_loose_frames() {
    // A viewer's handshake sends opcodes outside the server's emission
    // vocabulary; they must still frame correctly.
    let mut decoder = Decoder::new();
    decoder.feed(b"6.select,4.ball;4.size,4.1024,3.768,2.96;7.connect;");

    let select = decoder.next_frame().unwrap().unwrap();
    assert_eq!(select, Frame::new("select", vec!["ball".to_string()]));

    let size = decoder.next_frame().unwrap().unwrap();
    assert_eq!(size.args, vec!["1024", "768", "96"]);

    let connect = decoder.next_frame().unwrap().unwrap();
    assert_eq!(connect.opcode, "connect");
    assert!(connect.args.is_empty());
}
