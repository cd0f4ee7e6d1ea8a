use dynssz::{
    BitList, BitVector, Decode, DynSsz, Encode, ErrorKind, FixedVector, VariableList,
};
use dynssz_derive::{Decode, Encode};
use std::collections::HashMap;
use typenum::{U128, U2048, U32, U4, U64, U8, U8192};

fn plain() -> DynSsz {
    DynSsz::new(HashMap::new())
}

fn with_specs(pairs: &[(&str, u64)]) -> DynSsz {
    DynSsz::new(
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect(),
    )
}

#[derive(Debug, PartialEq, Clone, Default, Encode, Decode)]
struct Checkpoint {
    epoch: u64,
    root: [u8; 32],
}

#[derive(Debug, PartialEq, Clone, Default, Encode, Decode)]
struct AttestationData {
    slot: u64,
    index: u64,
    source: Checkpoint,
    target: Checkpoint,
}

#[derive(Debug, PartialEq, Clone, Default, Encode, Decode)]
struct PendingAttestation {
    #[ssz(static_size = "?", dynamic_size = "MAX_VALIDATORS_PER_COMMITTEE")]
    aggregation_bits: BitList<U2048>,
    data: AttestationData,
    inclusion_delay: u64,
}

#[derive(Debug, PartialEq, Clone, Default, Encode, Decode)]
struct HistoricalBatch {
    #[ssz(static_size = "64,32", dynamic_size = "SLOTS_PER_HISTORICAL_ROOT,32")]
    block_roots: FixedVector<[u8; 32], U64>,
    #[ssz(dynamic_size = "SLOTS_PER_HISTORICAL_ROOT,32")]
    state_roots: FixedVector<[u8; 32], U64>,
}

#[derive(Debug, PartialEq, Clone, Encode, Decode)]
struct SyncCommitteeContribution {
    slot: u64,
    #[ssz(dynamic_size = "SYNC_COMMITTEE_SIZE/SYNC_COMMITTEE_SUBNET_COUNT")]
    aggregation_bits: BitVector<U128>,
    signature: [u8; 96],
}

mod round_trip {
    use super::*;

    fn round_trip<T: Encode + Decode + std::fmt::Debug + PartialEq>(items: Vec<T>) {
        for item in items {
            let encoded = &item.as_ssz_bytes();
            assert_eq!(item.ssz_bytes_len(), encoded.len());
            assert_eq!(T::from_ssz_bytes(encoded), Ok(item));
        }
    }

    fn dyn_round_trip<T>(ssz: &DynSsz, items: Vec<T>)
    where
        T: dynssz::DynEncode + dynssz::DynDecode + Default + std::fmt::Debug + PartialEq + 'static,
    {
        for item in items {
            let encoded = ssz.marshal(&item).unwrap();
            assert_eq!(ssz.size(&item).unwrap(), encoded.len());

            let mut decoded = T::default();
            ssz.unmarshal(&mut decoded, &encoded).unwrap();
            assert_eq!(decoded, item);
        }
    }

    #[test]
    fn bool() {
        round_trip(vec![true, false]);
    }

    #[test]
    fn u8_array_4() {
        round_trip::<[u8; 4]>(vec![[0, 0, 0, 0], [1, 0, 0, 0], [1, 2, 3, 4]]);
    }

    #[test]
    fn vec_u16() {
        round_trip::<Vec<u16>>(vec![vec![], vec![255], vec![0, 1, 2], vec![100; 64]]);
    }

    #[test]
    fn fixed_container() {
        round_trip(vec![
            Checkpoint::default(),
            Checkpoint {
                epoch: 42,
                root: [13; 32],
            },
        ]);
    }

    #[test]
    fn nested_fixed_container() {
        round_trip(vec![AttestationData {
            slot: 7,
            index: 1,
            source: Checkpoint {
                epoch: 6,
                root: [1; 32],
            },
            target: Checkpoint {
                epoch: 7,
                root: [2; 32],
            },
        }]);
    }

    #[test]
    fn variable_container_static_path() {
        let mut bits = BitList::<U2048>::with_capacity(9).unwrap();
        bits.set(3, true).unwrap();

        round_trip(vec![
            PendingAttestation::default(),
            PendingAttestation {
                aggregation_bits: bits,
                data: AttestationData::default(),
                inclusion_delay: 4,
            },
        ]);
    }

    #[test]
    fn dynamic_codec_matches_defaults_without_overrides() {
        dyn_round_trip(&plain(), vec![Checkpoint::default()]);
        dyn_round_trip(
            &with_specs(&[("MAX_VALIDATORS_PER_COMMITTEE", 2048)]),
            vec![PendingAttestation {
                aggregation_bits: BitList::with_capacity(3).unwrap(),
                data: AttestationData::default(),
                inclusion_delay: 9,
            }],
        );
    }

    #[test]
    fn overridden_preset() {
        let ssz = with_specs(&[("SLOTS_PER_HISTORICAL_ROOT", 4)]);
        dyn_round_trip(
            &ssz,
            vec![HistoricalBatch {
                block_roots: vec![[1; 32]; 4].into(),
                state_roots: vec![[2; 32]; 4].into(),
            }],
        );
    }
}

mod scenarios {
    use super::*;

    #[test]
    fn uint64_little_endian() {
        let ssz = plain();
        assert_eq!(
            ssz.marshal(&0x0102030405060708_u64).unwrap(),
            vec![0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]
        );
    }

    #[test]
    fn vector_of_u16() {
        let ssz = plain();
        let vector = FixedVector::<u16, U4>::new(vec![1, 2, 3, 4]).unwrap();
        assert_eq!(
            ssz.marshal(&vector).unwrap(),
            vec![0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x04, 0x00]
        );
    }

    #[test]
    fn list_has_no_length_prefix() {
        let ssz = plain();
        let list = VariableList::<u16, U32>::new(vec![5, 6]).unwrap();
        assert_eq!(ssz.marshal(&list).unwrap(), vec![0x05, 0x00, 0x06, 0x00]);
    }

    #[test]
    fn bitlist_delimiter() {
        let ssz = plain();
        let mut bits = BitList::<U8>::with_capacity(3).unwrap();
        bits.set(0, true).unwrap();
        bits.set(2, true).unwrap();
        assert_eq!(ssz.marshal(&bits).unwrap(), vec![0x0d]);
    }

    #[derive(Debug, PartialEq, Clone, Default, Encode, Decode)]
    struct SmallContainer {
        a: u32,
        b: VariableList<u8, U32>,
        c: u8,
    }

    #[test]
    fn variable_container_layout() {
        let ssz = plain();
        let container = SmallContainer {
            a: 0x11,
            b: VariableList::new(vec![0xaa, 0xbb]).unwrap(),
            c: 0x22,
        };

        // Fixed part: a (4 bytes), offset to b (4 bytes), c (1 byte); then
        // b's payload.
        let expected = vec![
            0x11, 0x00, 0x00, 0x00, //
            0x09, 0x00, 0x00, 0x00, //
            0x22, //
            0xaa, 0xbb,
        ];
        assert_eq!(ssz.marshal(&container).unwrap(), expected);
        assert_eq!(container.as_ssz_bytes(), expected);

        let mut decoded = SmallContainer::default();
        ssz.unmarshal(&mut decoded, &expected).unwrap();
        assert_eq!(decoded, container);
    }

    #[derive(Debug, PartialEq, Clone, Default, Encode, Decode)]
    struct WithOptionalTail {
        a: u32,
        tail: Option<u64>,
    }

    #[test]
    fn trailing_bytes_on_a_variable_container_are_rejected() {
        let ssz = plain();

        // Bytes appended after a final byte list read as further elements,
        // so the surplus surfaces once the list passes its declared maximum.
        let container = SmallContainer {
            a: 0x11,
            b: VariableList::new(vec![0xaa, 0xbb]).unwrap(),
            c: 0x22,
        };
        let mut encoded = ssz.marshal(&container).unwrap();
        encoded.extend_from_slice(&[0; 31]);

        let mut decoded = SmallContainer::default();
        let err = ssz.unmarshal(&mut decoded, &encoded).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ListOverflow { len: 33, max: 32 });

        // A final field that cannot absorb the surplus reports it as extra
        // data.
        let value = WithOptionalTail { a: 7, tail: None };
        let mut encoded = ssz.marshal(&value).unwrap();
        encoded.push(0xff);

        let mut decoded = WithOptionalTail::default();
        let err = ssz.unmarshal(&mut decoded, &encoded).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ExtraData { .. }));
    }

    #[test]
    fn trailing_bytes_on_a_bare_list_are_extra_data() {
        let ssz = plain();

        // A surplus that is a multiple of the element size would read as
        // further elements; a ragged tail can only be trailing garbage.
        let mut encoded = ssz.marshal(&vec![1u32, 2]).unwrap();
        encoded.extend_from_slice(&[0xaa, 0xbb]);

        let mut decoded: Vec<u32> = vec![];
        let err = ssz.unmarshal(&mut decoded, &encoded).unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::ExtraData {
                len: 10,
                expected: 8
            }
        );

        let list = VariableList::<u16, U32>::new(vec![5, 6]).unwrap();
        let mut encoded = ssz.marshal(&list).unwrap();
        encoded.push(0x01);

        let mut decoded = VariableList::<u16, U32>::default();
        let err = ssz.unmarshal(&mut decoded, &encoded).unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::ExtraData {
                len: 5,
                expected: 4
            }
        );
    }

    #[derive(Debug, PartialEq, Clone, Default, Encode, Decode)]
    struct HistoricalRoots {
        #[ssz(static_size = "8192,32", dynamic_size = "SLOTS_PER_HISTORICAL_ROOT,32")]
        roots: FixedVector<[u8; 32], U8192>,
    }

    #[test]
    fn spec_dynamic_vector() {
        let ssz = with_specs(&[("SLOTS_PER_HISTORICAL_ROOT", 64)]);

        let value = HistoricalRoots {
            roots: vec![[0; 32]; 64].into(),
        };
        let encoded = ssz.marshal(&value).unwrap();
        assert_eq!(encoded.len(), 64 * 32);

        let oversized = HistoricalRoots {
            roots: vec![[0; 32]; 65].into(),
        };
        let err = ssz.marshal(&oversized).unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::SizeMismatch {
                expected: 64,
                found: 65
            }
        );
        assert_eq!(err.path(), "HistoricalRoots.roots");
    }
}

mod properties {
    use super::*;

    #[derive(Debug, PartialEq, Clone, Default, Encode, Decode)]
    struct TwoLists {
        a: u16,
        b: VariableList<u8, U32>,
        c: VariableList<u16, U32>,
        d: u8,
    }

    #[test]
    fn size_agrees_with_marshal() {
        let ssz = with_specs(&[("MAX_VALIDATORS_PER_COMMITTEE", 64)]);

        let attestation = PendingAttestation {
            aggregation_bits: BitList::with_capacity(40).unwrap(),
            data: AttestationData::default(),
            inclusion_delay: 3,
        };
        let encoded = ssz.marshal(&attestation).unwrap();
        assert_eq!(ssz.size(&attestation).unwrap(), encoded.len());

        let two_lists = TwoLists {
            a: 1,
            b: VariableList::new(vec![1, 2, 3]).unwrap(),
            c: VariableList::new(vec![9]).unwrap(),
            d: 5,
        };
        let encoded = ssz.marshal(&two_lists).unwrap();
        assert_eq!(ssz.size(&two_lists).unwrap(), encoded.len());
    }

    #[test]
    fn offsets_are_monotonic_and_start_after_fixed_part() {
        let ssz = plain();
        let value = TwoLists {
            a: 1,
            b: VariableList::new(vec![10, 11]).unwrap(),
            c: VariableList::new(vec![500, 501]).unwrap(),
            d: 9,
        };
        let encoded = ssz.marshal(&value).unwrap();

        // Fixed part: u16 (2) + offset (4) + offset (4) + u8 (1).
        let fixed_len = 11;
        let first = dynssz::read_offset(&encoded[2..6]).unwrap();
        let second = dynssz::read_offset(&encoded[6..10]).unwrap();

        assert_eq!(first, fixed_len);
        assert!(second >= first);
        assert!(second <= encoded.len());
    }

    #[test]
    fn fast_path_and_dynamic_path_agree() {
        let ssz = plain();
        let value = AttestationData {
            slot: 1,
            index: 2,
            source: Checkpoint {
                epoch: 3,
                root: [4; 32],
            },
            target: Checkpoint {
                epoch: 5,
                root: [6; 32],
            },
        };

        let desc = ssz.encode_descriptor::<AttestationData>().unwrap();
        assert!(!desc.needs_dynamic);
        assert!(desc.fast_path);

        // The dispatcher takes the static path here; force the dynamic path
        // and compare.
        let via_dispatcher = ssz.marshal(&value).unwrap();
        let mut via_dynamic = Vec::new();
        dynssz::DynEncode::dyn_ssz_append(&value, &ssz, &[], &mut via_dynamic).unwrap();

        assert_eq!(via_dispatcher, via_dynamic);
        assert_eq!(via_dispatcher, value.as_ssz_bytes());

        // Each accepts the other's output.
        let mut decoded = AttestationData::default();
        ssz.unmarshal(&mut decoded, &value.as_ssz_bytes()).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(
            AttestationData::from_ssz_bytes(&via_dispatcher),
            Ok(value)
        );
    }

    #[derive(Debug, PartialEq, Clone, Default, Encode, Decode)]
    #[ssz(dynamic_only)]
    struct NoFastPath {
        a: u64,
        b: VariableList<u8, U32>,
    }

    #[test]
    fn dynamic_only_types_skip_the_fast_path_but_encode_identically() {
        let ssz = plain();
        let desc = ssz.encode_descriptor::<NoFastPath>().unwrap();
        assert!(!desc.fast_path);
        assert!(!desc.needs_dynamic);

        let value = NoFastPath {
            a: 3,
            b: VariableList::new(vec![7, 8, 9]).unwrap(),
        };
        assert_eq!(ssz.marshal(&value).unwrap(), value.as_ssz_bytes());
    }

    #[test]
    fn fixed_types_are_spec_independent() {
        let value = AttestationData {
            slot: 11,
            ..AttestationData::default()
        };

        let a = plain().marshal(&value).unwrap();
        let b = with_specs(&[("SLOTS_PER_HISTORICAL_ROOT", 64), ("ANYTHING", 3)])
            .marshal(&value)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn expression_evaluation() {
        let x = dynssz::SizeExpr::parse("X*2-3")
            .unwrap()
            .eval(&vec![("X".to_string(), 10)].into_iter().collect())
            .unwrap();
        assert_eq!(x, 17);

        let y = dynssz::SizeExpr::parse("A*(B+C)")
            .unwrap()
            .eval(
                &vec![
                    ("A".to_string(), 2),
                    ("B".to_string(), 3),
                    ("C".to_string(), 5),
                ]
                .into_iter()
                .collect(),
            )
            .unwrap();
        assert_eq!(y, 16);
    }
}

mod dynamic {
    use super::*;

    #[test]
    fn minimal_preset_shrinks_the_wire_size() {
        let mainnet = with_specs(&[("SLOTS_PER_HISTORICAL_ROOT", 64)]);
        let minimal = with_specs(&[("SLOTS_PER_HISTORICAL_ROOT", 8)]);

        let mainnet_batch = HistoricalBatch {
            block_roots: vec![[0; 32]; 64].into(),
            state_roots: vec![[0; 32]; 64].into(),
        };
        let minimal_batch = HistoricalBatch {
            block_roots: vec![[0; 32]; 8].into(),
            state_roots: vec![[0; 32]; 8].into(),
        };

        assert_eq!(mainnet.marshal(&mainnet_batch).unwrap().len(), 2 * 64 * 32);
        assert_eq!(minimal.marshal(&minimal_batch).unwrap().len(), 2 * 8 * 32);

        // A mainnet-sized value does not satisfy the minimal preset.
        assert!(minimal.marshal(&mainnet_batch).is_err());
    }

    #[test]
    fn decode_respects_the_preset() {
        let minimal = with_specs(&[("SLOTS_PER_HISTORICAL_ROOT", 8)]);
        let batch = HistoricalBatch {
            block_roots: vec![[3; 32]; 8].into(),
            state_roots: vec![[4; 32]; 8].into(),
        };
        let encoded = minimal.marshal(&batch).unwrap();

        let mut decoded = HistoricalBatch::default();
        minimal.unmarshal(&mut decoded, &encoded).unwrap();
        assert_eq!(decoded, batch);
        assert_eq!(decoded.block_roots.len(), 8);

        // The same bytes cannot be decoded under the full-size preset.
        let mainnet = with_specs(&[("SLOTS_PER_HISTORICAL_ROOT", 64)]);
        let mut wrong = HistoricalBatch::default();
        assert!(mainnet.unmarshal(&mut wrong, &encoded).is_err());
    }

    #[test]
    fn dynamic_bitvector_length() {
        // SYNC_COMMITTEE_SIZE / SYNC_COMMITTEE_SUBNET_COUNT = 512 / 4 = 128
        // bits, sixteen bytes, matching the typenum default; with an
        // overridden subnet count the bitvector shrinks to eight bytes.
        let default = with_specs(&[
            ("SYNC_COMMITTEE_SIZE", 512),
            ("SYNC_COMMITTEE_SUBNET_COUNT", 4),
        ]);
        let halved = with_specs(&[
            ("SYNC_COMMITTEE_SIZE", 512),
            ("SYNC_COMMITTEE_SUBNET_COUNT", 8),
        ]);

        let contribution = SyncCommitteeContribution {
            slot: 4,
            aggregation_bits: BitVector::new(),
            signature: [0; 96],
        };
        assert_eq!(
            default.marshal(&contribution).unwrap().len(),
            8 + 16 + 96
        );

        let halved_contribution = SyncCommitteeContribution {
            slot: 4,
            aggregation_bits: BitVector::with_len(64),
            signature: [0; 96],
        };
        let encoded = halved.marshal(&halved_contribution).unwrap();
        assert_eq!(encoded.len(), 8 + 8 + 96);

        let mut decoded = SyncCommitteeContribution {
            slot: 0,
            aggregation_bits: BitVector::new(),
            signature: [0; 96],
        };
        halved.unmarshal(&mut decoded, &encoded).unwrap();
        assert_eq!(decoded, halved_contribution);
    }

    #[test]
    fn list_cap_from_spec_is_enforced_on_decode() {
        let ssz = with_specs(&[("MAX_VALIDATORS_PER_COMMITTEE", 8)]);

        // Twelve bits of payload exceeds the overridden maximum of eight.
        let mut attestation = PendingAttestation::default();
        attestation.aggregation_bits = BitList::with_capacity(12).unwrap();
        let encoded = with_specs(&[("MAX_VALIDATORS_PER_COMMITTEE", 64)])
            .marshal(&attestation)
            .unwrap();

        let mut decoded = PendingAttestation::default();
        let err = ssz.unmarshal(&mut decoded, &encoded).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ListOverflow { len: 12, max: 8 });
        assert_eq!(err.path(), "PendingAttestation.aggregation_bits");
    }

    #[derive(Debug, PartialEq, Clone, Default, Encode, Decode)]
    struct BrokenTag {
        #[ssz(dynamic_size = "NOT_REGISTERED")]
        items: VariableList<u8, U32>,
    }

    #[test]
    fn unknown_spec_value_fails_with_the_name() {
        let ssz = plain();
        let err = ssz.marshal(&BrokenTag::default()).unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::UnknownSpec("NOT_REGISTERED".to_string())
        );
        assert_eq!(err.path(), "BrokenTag.items");
    }

    #[derive(Debug, PartialEq, Clone, Default, Encode, Decode)]
    struct MismatchedTag {
        #[ssz(static_size = "64,32", dynamic_size = "SLOTS_PER_HISTORICAL_ROOT")]
        roots: FixedVector<[u8; 32], U64>,
    }

    #[test]
    fn dimension_count_mismatch_is_rejected_at_descriptor_build() {
        let ssz = with_specs(&[("SLOTS_PER_HISTORICAL_ROOT", 64)]);
        let err = ssz.marshal(&MismatchedTag::default()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Expression(_)));
    }

    #[test]
    fn nested_dynamic_containers_propagate() {
        #[derive(Debug, PartialEq, Clone, Default, Encode, Decode)]
        struct Inner {
            #[ssz(dynamic_size = "FIELD_ELEMENTS")]
            values: FixedVector<u64, U4>,
        }

        #[derive(Debug, PartialEq, Clone, Default, Encode, Decode)]
        struct Outer {
            inners: VariableList<Inner, U8>,
            tail: u8,
        }

        let ssz = with_specs(&[("FIELD_ELEMENTS", 2)]);

        let desc = ssz.encode_descriptor::<Outer>().unwrap();
        assert!(desc.needs_dynamic);

        let outer = Outer {
            inners: VariableList::new(vec![
                Inner {
                    values: vec![1, 2].into(),
                },
                Inner {
                    values: vec![3, 4].into(),
                },
            ])
            .unwrap(),
            tail: 7,
        };

        let encoded = ssz.marshal(&outer).unwrap();
        // Offset (4) + tail (1) + two 16-byte inners.
        assert_eq!(encoded.len(), 4 + 1 + 2 * 16);

        let mut decoded = Outer::default();
        ssz.unmarshal(&mut decoded, &encoded).unwrap();
        assert_eq!(decoded, outer);
    }

    #[test]
    fn error_paths_reach_into_nested_values() {
        #[derive(Debug, PartialEq, Clone, Default, Encode, Decode)]
        struct WithLists {
            items: VariableList<BitList<U8>, U4>,
        }

        let ssz = plain();
        let value = WithLists {
            items: VariableList::new(vec![
                BitList::with_capacity(2).unwrap(),
                BitList::with_capacity(2).unwrap(),
            ])
            .unwrap(),
        };
        let mut encoded = ssz.marshal(&value).unwrap();

        // Zero the final byte: the second bitlist loses its delimiter.
        let last = encoded.len() - 1;
        encoded[last] = 0;

        let mut decoded = WithLists::default();
        let err = ssz.unmarshal(&mut decoded, &encoded).unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::InvalidBitlist("missing length delimiter")
        );
        assert_eq!(err.path(), "WithLists.items[1]");
        assert_eq!(err.byte_offset(), Some(last));
    }
}

mod unions {
    use super::*;

    #[derive(Debug, PartialEq, Clone, Encode, Decode)]
    #[ssz(enum_behaviour = "union")]
    enum Payload {
        Blinded(VariableList<u8, U32>),
        Full(u64),
    }

    #[derive(Debug, PartialEq, Clone, Encode, Decode)]
    #[ssz(enum_behaviour = "union")]
    enum MaybeExit {
        Inactive,
        Exit(u64),
    }

    #[test]
    fn selector_prefixes_the_variant() {
        let ssz = plain();
        assert_eq!(
            ssz.marshal(&Payload::Full(5)).unwrap(),
            vec![1, 5, 0, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(
            ssz.marshal(&Payload::Blinded(VariableList::new(vec![0xaa]).unwrap()))
                .unwrap(),
            vec![0, 0xaa]
        );
    }

    #[test]
    fn union_round_trip() {
        let ssz = plain();
        for value in vec![
            Payload::Blinded(VariableList::new(vec![1, 2, 3]).unwrap()),
            Payload::Full(u64::max_value()),
        ] {
            let encoded = ssz.marshal(&value).unwrap();
            assert_eq!(ssz.size(&value).unwrap(), encoded.len());

            let mut decoded = Payload::Full(0);
            ssz.unmarshal(&mut decoded, &encoded).unwrap();
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn null_variant_is_a_bare_selector() {
        let ssz = plain();
        assert_eq!(ssz.marshal(&MaybeExit::Inactive).unwrap(), vec![0]);
        assert_eq!(
            ssz.marshal(&MaybeExit::Exit(3)).unwrap(),
            vec![1, 3, 0, 0, 0, 0, 0, 0, 0]
        );

        let mut decoded = MaybeExit::Inactive;
        ssz.unmarshal(&mut decoded, &[1, 9, 0, 0, 0, 0, 0, 0, 0])
            .unwrap();
        assert_eq!(decoded, MaybeExit::Exit(9));

        // A null selector with a payload is rejected.
        let err = ssz
            .unmarshal(&mut decoded, &[0, 1])
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ExtraData { .. }));
    }

    #[test]
    fn out_of_range_selector_is_rejected() {
        let ssz = plain();
        let mut decoded = Payload::Full(0);
        let err = ssz.unmarshal(&mut decoded, &[2, 0]).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidUnionSelector(2));

        let err = ssz.unmarshal(&mut decoded, &[200, 0]).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidUnionSelector(200));
    }

    #[test]
    fn option_is_the_canonical_two_variant_union() {
        let ssz = plain();
        let some: Option<u16> = Some(0x1122);
        assert_eq!(ssz.marshal(&some).unwrap(), vec![1, 0x22, 0x11]);

        let none: Option<u16> = None;
        assert_eq!(ssz.marshal(&none).unwrap(), vec![0]);
    }
}

mod spec_config {
    use super::*;
    use serde_derive::Deserialize;

    /// Preset values arrive quoted in the upstream YAML/JSON config files.
    #[derive(Deserialize)]
    struct PresetFile {
        #[serde(with = "dynssz::serde_utils::quoted_u64")]
        slots_per_historical_root: u64,
    }

    #[test]
    fn quoted_preset_values_feed_the_registry() {
        let preset: PresetFile =
            serde_json::from_str(r#"{ "slots_per_historical_root": "8" }"#).unwrap();

        let mut values = HashMap::new();
        values.insert(
            "SLOTS_PER_HISTORICAL_ROOT".to_string(),
            preset.slots_per_historical_root,
        );
        let ssz = DynSsz::new(values);

        let batch = HistoricalBatch {
            block_roots: vec![[0; 32]; 8].into(),
            state_roots: vec![[0; 32]; 8].into(),
        };
        assert_eq!(ssz.marshal(&batch).unwrap().len(), 2 * 8 * 32);
    }

    #[test]
    fn byte_lists_serialize_as_prefixed_hex() {
        #[derive(Debug, PartialEq, serde_derive::Serialize, serde_derive::Deserialize)]
        struct Graffiti {
            #[serde(with = "dynssz::serde_utils::hex_var_list")]
            data: VariableList<u8, U32>,
        }

        let graffiti = Graffiti {
            data: VariableList::new(vec![0, 1, 0xab]).unwrap(),
        };
        let json = serde_json::to_string(&graffiti).unwrap();
        assert_eq!(json, r#"{"data":"0x0001ab"}"#);
        assert_eq!(serde_json::from_str::<Graffiti>(&json).unwrap(), graffiti);
    }
}
