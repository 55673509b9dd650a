// ==========================================
// 批量导入集成测试
// ==========================================
// 职责: 解析 → 预览 → 执行 → 汇总 / 报告 的端到端流程
// 远端: 内存 Mock 仓储（见 test_helpers）
// ==========================================


#[cfg(test)]
mod bulk_import_test {
    use crate::test_helpers::*;
    use catalog_bulk_import::domain::{ImportMode, PricingMode, RowAction, RunPhase};
    use catalog_bulk_import::importer::ImportError;
    use catalog_bulk_import::ProductColumn;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

    // ==========================================
    // 解析与预览
    // ==========================================

    #[tokio::test]
    async fn test_create_preview_splits_valid_invalid_and_warnings() {
        let ctx = build_context(PricingMode::WithTax);
        let csv = "nombre,sku,precio,stock,categorias,extra\n\
                   Camiseta,CAM-1,49.90,10,Hombre > Ropa,x\n\
                   Pantalon,PAN-1,,5,,y\n\
                   Falda,FAL-1,59.90,3,Nino > Ropa,z\n";

        let parsed = ctx.importer.parse_text(ImportMode::Create, csv).await.unwrap();

        assert_eq!(parsed.valid_count(), 2);
        assert_eq!(parsed.invalid_count(), 1);
        assert_eq!(parsed.warning_count(), 1);
        assert_eq!(parsed.unknown_columns, vec!["extra".to_string()]);

        let invalid = parsed.invalid_rows().next().unwrap();
        assert_eq!(invalid.row_number, 3);
        assert_eq!(invalid.errors.len(), 1);

        let warned = &parsed.rows[2];
        assert!(warned.is_valid);
        assert!(warned.warnings[0].contains("\"Nino > Ropa\""));
    }

    #[tokio::test]
    async fn test_missing_sku_header_rejects_whole_file() {
        let ctx = build_context(PricingMode::WithTax);
        let err = ctx
            .importer
            .parse_text(ImportMode::Create, "nombre,precio,stock\nA,1,1\n")
            .await
            .unwrap_err();

        match err {
            ImportError::MissingRequiredColumns(cols) => assert_eq!(cols, vec!["sku".to_string()]),
            other => panic!("意外错误: {:?}", other),
        }
        assert!(ctx.importer.parsed_file().is_none());
    }

    #[tokio::test]
    async fn test_empty_file_rejected() {
        let ctx = build_context(PricingMode::WithTax);
        let err = ctx
            .importer
            .parse_text(ImportMode::Create, "nombre,sku,precio,stock\n")
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::EmptyFile));
    }

    #[tokio::test]
    async fn test_duplicate_sku_invalidates_later_row() {
        let ctx = build_context(PricingMode::WithTax);
        let csv = "nombre,sku,precio,stock\nA,DUP-1,1,1\nB,DUP-1,2,2\n";

        let parsed = ctx.importer.parse_text(ImportMode::Create, csv).await.unwrap();

        assert!(parsed.rows[0].is_valid);
        assert!(!parsed.rows[1].is_valid);
        assert!(parsed.rows[1].errors[0].contains("DUP-1"));
    }

    #[tokio::test]
    async fn test_parse_file_reads_bom_prefixed_csv() {
        let ctx = build_context(PricingMode::WithTax);
        let path = ctx.output.path().join("productos.csv");
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(create_csv(2).as_bytes());
        std::fs::write(&path, bytes).unwrap();

        let parsed = ctx.importer.parse_file(ImportMode::Create, &path).await.unwrap();
        assert_eq!(parsed.valid_count(), 2);
        assert!(parsed.unknown_columns.is_empty());
    }

    #[tokio::test]
    async fn test_reference_data_loaded_once() {
        let ctx = build_context(PricingMode::WithTax);

        ctx.importer.parse_text(ImportMode::Create, &create_csv(1)).await.unwrap();
        ctx.importer.parse_text(ImportMode::Create, &create_csv(2)).await.unwrap();

        assert_eq!(ctx.references.category_fetches.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.references.brand_fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reference_load_failure_is_retried_on_next_parse() {
        let mut references = MockCatalogReferenceRepository::new(PricingMode::WithTax);
        references.fail_brands = true;
        let ctx = build_context_with(references);

        let err = ctx
            .importer
            .parse_text(ImportMode::Create, &create_csv(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::ReferenceLoadError(_)));

        let _ = ctx.importer.parse_text(ImportMode::Create, &create_csv(1)).await;
        assert_eq!(ctx.references.brand_fetches.load(Ordering::SeqCst), 2);
    }

    // ==========================================
    // 执行
    // ==========================================

    #[tokio::test]
    async fn test_create_run_end_to_end() {
        let ctx = build_context(PricingMode::WithTax);
        let csv = "nombre,sku,precio,stock,categorias,marca,gamma\n\
                   Camiseta,CAM-1,49.90,10,\"Hombre > Ropa,Mujer > Ropa\",Mi Marca,Linea Casual\n\
                   Sin precio,SP-1,,1,,,\n\
                   Polo,POL-1,29.90,4,,,\n";
        ctx.importer.parse_text(ImportMode::Create, csv).await.unwrap();

        let results = ctx.importer.start_processing().await.unwrap();

        // 有效行按顺序在前，无效行以 skipped 追加在后
        let rows: Vec<usize> = results.iter().map(|r| r.row_number).collect();
        assert_eq!(rows, vec![2, 4, 3]);
        assert!(results[0].success);
        assert_eq!(results[0].action, RowAction::Created);
        assert!(results[0].product_id.is_some());
        assert_eq!(results[2].action, RowAction::Skipped);
        assert!(!results[2].success);

        let created = ctx.products.created.lock().unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(created[0].price, Some(49.90));
        assert_eq!(created[0].brand_id, Some(10));
        assert_eq!(created[0].gamma_id, Some(100));
        assert_eq!(created[0].categories, Some(vec![2, 4]));
        drop(created);

        let summary = ctx.importer.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.created, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.errors, 0);

        let state = ctx.importer.progress();
        assert_eq!(state.phase, RunPhase::Completed);
        assert!(!state.is_processing);
        assert_eq!(state.progress_percent(), 100);
    }

    #[tokio::test]
    async fn test_pricing_mode_without_tax_sends_price_without_tax() {
        let ctx = build_context(PricingMode::WithoutTax);
        ctx.importer.parse_text(ImportMode::Create, &create_csv(1)).await.unwrap();
        ctx.importer.start_processing().await.unwrap();

        let created = ctx.products.created.lock().unwrap();
        assert_eq!(created[0].price, None);
        assert_eq!(created[0].price_without_tax, Some(1.5));
    }

    #[tokio::test]
    async fn test_rejection_is_not_retried() {
        let ctx = build_context(PricingMode::WithTax);
        ctx.products.script("SKU-2", Outcome::Reject);
        ctx.importer.parse_text(ImportMode::Create, &create_csv(3)).await.unwrap();

        let results = ctx.importer.start_processing().await.unwrap();

        assert_eq!(ctx.products.attempts_for("SKU-2"), 1);
        assert_eq!(results[1].error.as_deref(), Some(REJECT_MESSAGE));
        assert!(results[2].success);

        let summary = ctx.importer.summary();
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.total, summary.created + summary.updated + summary.errors + summary.skipped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_retried_with_linear_backoff() {
        let ctx = build_context(PricingMode::WithTax);
        ctx.products.script("SKU-1", Outcome::Transport);
        ctx.importer.parse_text(ImportMode::Create, &create_csv(2)).await.unwrap();

        let results = ctx.importer.start_processing().await.unwrap();

        assert_eq!(ctx.products.attempts_for("SKU-1"), 3);
        assert!(!results[0].success);
        assert_eq!(results[0].error.as_deref(), Some("connection refused"));
        assert!(results[1].success);

        // 第 1 次失败后等 1000ms，第 2 次失败后等 2000ms
        let at = ctx.products.attempt_instants("SKU-1");
        assert_eq!(at.len(), 3);
        assert_close(at[1] - at[0], Duration::from_millis(1000));
        assert_close(at[2] - at[1], Duration::from_millis(2000));

        // 最后一次失败后不再等待，下一行紧接着提交
        let next = ctx.products.attempt_instants("SKU-2");
        assert_close(next[0] - at[2], Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_run_is_closed_and_can_restart() {
        let ctx = build_context(PricingMode::WithTax);
        ctx.products.script("SKU-1", Outcome::Transport);
        ctx.importer.parse_text(ImportMode::Create, &create_csv(2)).await.unwrap();

        // 第一次尝试失败后进入 1000ms 退避，超时在退避中丢弃运行
        let timed_out =
            tokio::time::timeout(Duration::from_millis(500), ctx.importer.start_processing()).await;
        assert!(timed_out.is_err());

        let state = ctx.importer.progress();
        assert_eq!(state.phase, RunPhase::Cancelled);
        assert!(!state.is_processing);
        assert!(state.finished_at.is_some());

        ctx.products.script("SKU-1", Outcome::Accept);
        let results = ctx.importer.start_processing().await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.success));
        assert_eq!(ctx.importer.progress().phase, RunPhase::Completed);

        ctx.importer.reset().unwrap();
        assert!(ctx.importer.results().is_empty());
    }

    #[tokio::test]
    async fn test_edit_run_updates_by_id_and_skips_rows_without_id() {
        let ctx = build_context(PricingMode::WithTax);
        let csv = "id,sku,precio,stock\n5,SKU-5,10,\n,SKU-6,12,3\n";
        let parsed = ctx.importer.parse_text(ImportMode::Edit, csv).await.unwrap();
        assert_eq!(parsed.valid_count(), 2);

        let results = ctx.importer.start_processing().await.unwrap();

        assert_eq!(results[0].action, RowAction::Updated);
        assert_eq!(results[0].product_id, Some(5));
        assert_eq!(results[1].action, RowAction::Skipped);
        assert!(results[1].error.is_some());

        // 缺 id 的行不发起远端调用
        assert_eq!(ctx.products.call_count(), 1);
        let updated = ctx.products.updated.lock().unwrap();
        assert_eq!(updated[0].0, 5);
        assert_eq!(updated[0].1.price, Some(10.0));
        assert_eq!(updated[0].1.stock, None);
        drop(updated);

        let summary = ctx.importer.summary();
        assert_eq!((summary.updated, summary.skipped, summary.errors), (1, 1, 0));
    }

    #[tokio::test]
    async fn test_cancel_stops_before_next_row() {
        let ctx = build_context(PricingMode::WithTax);
        let mut csv = create_csv(5);
        csv.push_str("Invalido,INV-1,abc,1\n");
        ctx.importer.parse_text(ImportMode::Create, &csv).await.unwrap();
        ctx.products.on_call(2, ControlAction::Cancel, ctx.importer.control());

        let results = ctx.importer.start_processing().await.unwrap();

        assert_eq!(ctx.products.call_count(), 2);
        let skus: Vec<&str> = results.iter().map(|r| r.sku.as_str()).collect();
        assert_eq!(skus, vec!["SKU-1", "SKU-2", "INV-1"]);

        let state = ctx.importer.progress();
        assert_eq!(state.phase, RunPhase::Cancelled);
        assert!(state.is_cancelled);
        assert!(!state.is_processing);
    }

    #[tokio::test]
    async fn test_pause_blocks_until_resume() {
        let ctx = build_context(PricingMode::WithTax);
        ctx.importer.parse_text(ImportMode::Create, &create_csv(4)).await.unwrap();
        let control = ctx.importer.control();
        ctx.products.on_call(2, ControlAction::Pause, control.clone());

        let importer = ctx.importer.clone();
        let run = tokio::spawn(async move { importer.start_processing().await });

        wait_until(|| ctx.importer.progress().is_paused).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ctx.products.call_count(), 2);
        assert_eq!(ctx.importer.results().len(), 2);

        // 运行中: 不可再次启动，不可重置
        assert!(matches!(
            ctx.importer.start_processing().await,
            Err(ImportError::RunInProgress(_))
        ));
        assert!(matches!(ctx.importer.reset(), Err(ImportError::RunInProgress(_))));

        control.resume();
        let results = run.await.unwrap().unwrap();

        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.success));
        assert_eq!(ctx.importer.progress().phase, RunPhase::Completed);
    }

    #[tokio::test]
    async fn test_cancel_while_paused_ends_run() {
        let ctx = build_context(PricingMode::WithTax);
        ctx.importer.parse_text(ImportMode::Create, &create_csv(3)).await.unwrap();
        let control = ctx.importer.control();
        ctx.products.on_call(1, ControlAction::Pause, control.clone());

        let importer = ctx.importer.clone();
        let run = tokio::spawn(async move { importer.start_processing().await });

        wait_until(|| ctx.importer.progress().is_paused).await;
        control.cancel();
        let results = run.await.unwrap().unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(ctx.importer.progress().phase, RunPhase::Cancelled);
    }

    #[tokio::test]
    async fn test_start_without_parsed_file() {
        let ctx = build_context(PricingMode::WithTax);
        assert!(matches!(
            ctx.importer.start_processing().await,
            Err(ImportError::NoParsedFile)
        ));
    }

    #[tokio::test]
    async fn test_reset_clears_session() {
        let ctx = build_context(PricingMode::WithTax);
        ctx.importer.parse_text(ImportMode::Create, &create_csv(2)).await.unwrap();
        ctx.importer.start_processing().await.unwrap();

        ctx.importer.reset().unwrap();

        assert!(ctx.importer.parsed_file().is_none());
        assert!(ctx.importer.results().is_empty());
        assert_eq!(ctx.importer.progress().phase, RunPhase::Idle);
        assert!(matches!(
            ctx.importer.start_processing().await,
            Err(ImportError::NoParsedFile)
        ));
    }

    #[tokio::test]
    async fn test_rerun_replaces_previous_results() {
        let ctx = build_context(PricingMode::WithTax);
        ctx.importer.parse_text(ImportMode::Create, &create_csv(2)).await.unwrap();
        ctx.importer.start_processing().await.unwrap();
        let second = ctx.importer.start_processing().await.unwrap();

        assert_eq!(second.len(), 2);
        assert_eq!(ctx.importer.summary().total, 2);
    }

    // ==========================================
    // 报告与模板
    // ==========================================

    #[tokio::test]
    async fn test_error_report_written_only_for_failures() {
        let ctx = build_context(PricingMode::WithTax);
        ctx.importer.parse_text(ImportMode::Create, &create_csv(2)).await.unwrap();
        ctx.importer.start_processing().await.unwrap();
        assert!(ctx.importer.write_error_report().unwrap().is_none());

        ctx.products.script("SKU-1", Outcome::Reject);
        ctx.importer.start_processing().await.unwrap();
        let path = ctx.importer.write_error_report().unwrap().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("2,Producto 1,SKU-1,"));
        assert!(lines[1].ends_with(REJECT_MESSAGE));
    }

    #[tokio::test]
    async fn test_create_template_written_with_required_columns() {
        let ctx = build_context(PricingMode::WithTax);
        let path = ctx
            .importer
            .write_create_template(&[ProductColumn::Description])
            .unwrap();

        assert!(path.starts_with(ctx.output.path()));
        let bytes = std::fs::read(&path).unwrap();
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        assert_eq!(text.lines().next(), Some("nombre,sku,precio,stock,descripcion"));
        assert_eq!(text.lines().count(), 3);
    }

    #[tokio::test]
    async fn test_edit_template_requests_identifier_columns() {
        let ctx = build_context(PricingMode::WithTax);
        let path = ctx
            .importer
            .download_edit_template(&[ProductColumn::Stock])
            .await
            .unwrap();

        let exported = ctx.products.exported.lock().unwrap();
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0][0], "id");
        assert!(exported[0].contains(&"sku".to_string()));
        assert!(exported[0].contains(&"stock".to_string()));

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("plantilla_productos_editar_"));
        assert!(std::fs::read(&path).unwrap().starts_with(UTF8_BOM));
    }

    // ==========================================
    // 辅助
    // ==========================================

    fn assert_close(actual: Duration, expected: Duration) {
        let diff = if actual > expected { actual - expected } else { expected - actual };
        assert!(diff <= Duration::from_millis(50), "实际 {:?}，期望 {:?}", actual, expected);
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..500 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("等待条件超时");
    }
}
