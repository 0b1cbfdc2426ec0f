//! Whole-chunk decoding: volume header, records and message dispatch.

use bytes::Bytes;
use level2_parser::{decode_chunk, ByteCursor, Level2Error, Message5, Product, RadarKind, Waveform};
use test_utils::{
    filler_message, site, tdwr, ChunkBuilder, Message31Builder, Message5Builder, RecordBuilder,
    VolumeHeaderBuilder,
};

fn ref_radial(status: u8) -> Vec<u8> {
    Message31Builder::new()
        .status(status)
        .reflectivity(&[10, 20, 30], 2.0, 0.0)
        .build_message()
}

#[test]
fn test_vcp_then_radial_in_one_record() {
    let chunk = ChunkBuilder::new()
        .volume_header(VolumeHeaderBuilder::new().build())
        .record(
            RecordBuilder::new()
                .message(Message5Builder::new(212).cut(0.5, 1).cut(0.5, 2).build_message())
                .message(ref_radial(2))
                .build(),
        )
        .build();

    let chunk = decode_chunk(Bytes::from(chunk)).unwrap();

    assert_eq!(chunk.icao().as_deref(), Some(site::ICAO));
    assert_eq!(chunk.profile.kind, RadarKind::Nexrad);
    assert_eq!(chunk.vcp_number(), Some(212));
    assert_eq!(chunk.radials.len(), 1);
    assert_eq!(chunk.stats.records, 1);
    assert_eq!(chunk.stats.messages, 2);
    assert_eq!(chunk.stats.failed_radials, 0);

    let vcp = chunk.vcp.as_ref().unwrap();
    assert_eq!(vcp.elevation_cuts.len(), 2);
    assert!(vcp.is_complete());
    assert_eq!(vcp.elevation_cuts[1].waveform(), Waveform::ContiguousDopplerWithGating);
    assert!((vcp.elevation_cuts[0].elevation_degrees() - 0.5).abs() < 0.05);

    let radial = &chunk.radials[0];
    assert!(radial.status().is_end_of_elevation());
    assert_eq!(radial.moments[&Product::Reflectivity].data, vec![5.0, 10.0, 15.0]);
}

#[test]
fn test_compressed_records() {
    let chunk = ChunkBuilder::new()
        .volume_header(VolumeHeaderBuilder::new().build())
        .record(
            RecordBuilder::new()
                .message(filler_message(15))
                .message(Message5Builder::new(35).build_message())
                .compressed()
                .build(),
        )
        .record(
            RecordBuilder::new()
                .message(ref_radial(0))
                .message(ref_radial(1))
                .message(ref_radial(2))
                .compressed()
                .build(),
        )
        .build();

    let chunk = decode_chunk(Bytes::from(chunk)).unwrap();

    assert_eq!(chunk.stats.records, 2);
    assert_eq!(chunk.stats.skipped_messages, 1);
    assert_eq!(chunk.vcp_number(), Some(35));
    assert_eq!(chunk.radials.len(), 3);
}

#[test]
fn test_headerless_intermediate_chunk() {
    let chunk = ChunkBuilder::new()
        .record(
            RecordBuilder::new()
                .message(ref_radial(1))
                .compressed()
                .build(),
        )
        .build();

    let chunk = decode_chunk(Bytes::from(chunk)).unwrap();

    assert!(chunk.volume_header.is_none());
    assert!(chunk.vcp.is_none());
    assert_eq!(chunk.radials.len(), 1);
    // Identity comes from the radial when the header is absent
    assert_eq!(chunk.icao().as_deref(), Some(site::ICAO));
}

#[test]
fn test_bad_radial_does_not_stop_the_record() {
    // A radial that declares a moment longer than its frame, followed by a good one.
    let mut broken = Message31Builder::new().reflectivity(&[1; 40], 2.0, 0.0).build_message();
    broken.truncate(broken.len() - 20);
    let half_words = ((broken.len() - 12) / 2) as u16;
    broken[12..14].copy_from_slice(&half_words.to_be_bytes());

    let chunk = ChunkBuilder::new()
        .record(
            RecordBuilder::new()
                .message(broken)
                .message(ref_radial(2))
                .build(),
        )
        .build();

    let chunk = decode_chunk(Bytes::from(chunk)).unwrap();

    assert_eq!(chunk.stats.failed_radials, 1);
    assert_eq!(chunk.radials.len(), 1);
    assert_eq!(
        chunk.radials[0].moments[&Product::Reflectivity].data,
        vec![5.0, 10.0, 15.0]
    );
}

#[test]
fn test_negative_size_is_recorded_not_terminal() {
    let chunk = ChunkBuilder::new()
        .record(RecordBuilder::new().message(ref_radial(1)).end_of_volume().build())
        .record(RecordBuilder::new().message(ref_radial(4)).build())
        .build();

    let chunk = decode_chunk(Bytes::from(chunk)).unwrap();

    assert!(chunk.stats.end_of_volume_marker);
    assert_eq!(chunk.radials.len(), 2);
    assert!(chunk.radials[1].status().is_end_of_volume());
}

#[test]
fn test_corrupt_compressed_record_aborts_chunk() {
    let mut data = VolumeHeaderBuilder::new().build();
    data.extend(RecordBuilder::new().message(ref_radial(1)).build());
    data.extend_from_slice(&12i32.to_be_bytes());
    data.extend_from_slice(b"BZh91AY&SYxx");

    let err = decode_chunk(Bytes::from(data)).unwrap_err();
    assert!(matches!(err, Level2Error::Decompression { .. }));
    assert!(err.is_framing());
}

#[test]
fn test_truncated_record_size_aborts_chunk() {
    let mut data = RecordBuilder::new().message(ref_radial(1)).build();
    data.extend_from_slice(&[0, 1]);

    let err = decode_chunk(Bytes::from(data)).unwrap_err();
    assert!(matches!(err, Level2Error::TruncatedRecord { .. }));
}

#[test]
fn test_tdwr_chunk_selects_tdwr_profile() {
    let chunk = ChunkBuilder::new()
        .volume_header(VolumeHeaderBuilder::new().tape(tdwr::TAPE).icao(tdwr::ICAO).build())
        .record(
            RecordBuilder::new()
                .message(Message5Builder::new(tdwr::VCP).build_message())
                .message(
                    Message31Builder::new()
                        .tdwr()
                        .icao(tdwr::ICAO)
                        .reflectivity(&[10], 2.0, 0.0)
                        .build_message(),
                )
                .compressed()
                .build(),
        )
        .build();

    let chunk = decode_chunk(Bytes::from(chunk)).unwrap();

    assert_eq!(chunk.profile.kind, RadarKind::Tdwr);
    assert_eq!(chunk.icao().as_deref(), Some(tdwr::ICAO));
    assert_eq!(chunk.vcp_number(), Some(tdwr::VCP));
    assert!(chunk.radials[0].volume.as_ref().unwrap().zdr_bias_estimate.is_none());
}

#[test]
fn test_blank_header_icao_falls_back_to_radial() {
    let chunk = ChunkBuilder::new()
        .volume_header(VolumeHeaderBuilder::new().blank_icao().build())
        .record(RecordBuilder::new().message(ref_radial(1)).build())
        .build();

    let chunk = decode_chunk(Bytes::from(chunk)).unwrap();
    assert_eq!(chunk.icao().as_deref(), Some(site::ICAO));
}

#[test]
fn test_vcp_stops_early_on_short_stream() {
    let body = Message5Builder::new(212).cut(0.5, 1).declared_cuts(14).build_body();

    let vcp = Message5::decode(&mut ByteCursor::new(&body)).unwrap();
    assert_eq!(vcp.header.number_of_cuts, 14);
    assert_eq!(vcp.elevation_cuts.len(), 1);
    assert!(!vcp.is_complete());
}
