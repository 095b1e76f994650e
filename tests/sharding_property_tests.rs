use proptest::prelude::*;

use samudra_core::schema::{DataType, Field, Schema};
use samudra_core::{Column, Row, Value};
use samudra_storage::batch::{BatchColumn, RecordBatch};
use samudra_storage::row_reader::RowFieldReader;
use samudra_storage::sharding::{build_sharding_operator, LogsSharding, ShardingDescriptor};

fn field(name: &str, data_type: DataType) -> Field {
    Field {
        name: name.to_string(),
        data_type,
        nullable: false,
        default_value: None,
    }
}

proptest! {
    #[test]
    fn test_bulk_sharding_is_deterministic_and_in_range(
        uids in prop::collection::vec("[a-z0-9]{1,24}", 1..200),
        shards in 1u32..64,
        seed in any::<u64>()
    ) {
        let schema = Schema::new(vec![field("uid", DataType::String)]);
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![BatchColumn::new(Column::String(uids.clone()))],
        ).unwrap();

        let descriptor = ShardingDescriptor::modulo_n(vec!["uid".into()], shards).with_seed(seed);
        let strategy = build_sharding_operator(&descriptor, &schema).unwrap().unwrap();

        let first = strategy.make_sharding(&batch);
        let second = strategy.make_sharding(&batch);

        prop_assert_eq!(first.len(), uids.len());
        prop_assert_eq!(&first, &second);
        prop_assert!(first.iter().all(|&s| s < shards));
    }

    #[test]
    fn test_point_and_bulk_paths_agree(
        uid in "[a-zA-Z0-9_-]{0,40}",
        seq in any::<u64>(),
        shards in 1u32..128,
        seed in any::<u64>()
    ) {
        let schema = Schema::new(vec![
            field("uid", DataType::String),
            field("seq", DataType::UInt64),
        ]);
        let columns = vec!["uid".to_string(), "seq".to_string()];
        let descriptor = ShardingDescriptor::modulo_n(columns.clone(), shards).with_seed(seed);
        let strategy = build_sharding_operator(&descriptor, &schema).unwrap().unwrap();

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                BatchColumn::new(Column::String(vec![uid.clone()])),
                BatchColumn::new(Column::UInt64(vec![seq])),
            ],
        ).unwrap();
        let bulk = strategy.make_sharding(&batch);

        let remap = schema.fields.iter()
            .map(|f| (f.name.clone(), f.data_type.clone()))
            .collect();
        let reader = RowFieldReader::new(&schema, &remap, &columns).unwrap();
        let row = Row::new(vec![Value::String(uid), Value::UInt64(seq)]);
        let point = strategy.calc_shard_id(&row, &reader).unwrap();

        prop_assert_eq!(bulk, vec![point]);
    }

    #[test]
    fn test_logs_bucket_never_spills_its_window(
        bucket in -1000i64..1000,
        offsets in prop::collection::vec(0i64..LogsSharding::BUCKET_WIDTH_MICROS, 1..100),
        uids in prop::collection::vec("[a-z0-9]{1,16}", 100),
        active in 1u32..4,
        extra in 0u32..12
    ) {
        let shards = active + extra;
        let schema = Schema::new(vec![
            field("ts", DataType::Timestamp),
            field("uid", DataType::String),
        ]);
        let descriptor = ShardingDescriptor::cloud_logs(vec!["ts".into(), "uid".into()], shards)
            .with_active_shards(active);
        let strategy = build_sharding_operator(&descriptor, &schema).unwrap().unwrap();

        let start = bucket * LogsSharding::BUCKET_WIDTH_MICROS;
        let n = offsets.len();
        let ts: Vec<i64> = offsets.iter().map(|o| start + o).collect();
        let batch = RecordBatch::try_new(
            schema,
            vec![
                BatchColumn::new(Column::Timestamp(ts)),
                BatchColumn::new(Column::String(uids[..n].to_vec())),
            ],
        ).unwrap();

        let out = strategy.make_sharding(&batch);
        prop_assert_eq!(out.len(), n);
        prop_assert!(out.iter().all(|&s| s < shards));

        let distinct: std::collections::HashSet<u32> = out.into_iter().collect();
        prop_assert!(distinct.len() <= active as usize);
    }

    #[test]
    fn test_row_order_does_not_affect_each_rows_shard(
        uids in prop::collection::vec("[a-z0-9]{1,16}", 2..50),
        shards in 1u32..32
    ) {
        let schema = Schema::new(vec![field("uid", DataType::String)]);
        let descriptor = ShardingDescriptor::modulo_n(vec!["uid".into()], shards);
        let strategy = build_sharding_operator(&descriptor, &schema).unwrap().unwrap();

        let forward = RecordBatch::try_new(
            schema.clone(),
            vec![BatchColumn::new(Column::String(uids.clone()))],
        ).unwrap();
        let mut reversed_uids = uids.clone();
        reversed_uids.reverse();
        let reversed = RecordBatch::try_new(
            schema,
            vec![BatchColumn::new(Column::String(reversed_uids))],
        ).unwrap();

        let forward_out = strategy.make_sharding(&forward);
        let mut reversed_out = strategy.make_sharding(&reversed);
        reversed_out.reverse();
        prop_assert_eq!(forward_out, reversed_out);
    }
}
