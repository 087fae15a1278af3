//! End-to-end import of a small workspace into a SQLite database.

#![allow(missing_docs)]

use std::{fs, path::Path};

use regtree::{
    import::collect_sources, Annotator, Config, HierarchyType, Importer, Outcome, Query,
    SqliteStore, Store,
};

const CIVIL_CODE: &str = "\
民法
修正日期：民國 110 年 01 月 20 日
第一章 總則
第一節 通則
第 1 條 民事，法律所未規定者，依習慣；無習慣者，依法理。
第 2 條 民事所適用之習慣，以不背於公共秩序或善良風俗者為限。
第二章 人
第 3 條 依法律之規定，有使用文字之必要者，得不由本人自寫。
";

const GUIDELINE: &str = "\
採購作業要點
一、為辦理採購，特訂定本要點。
二、本要點用詞定義如下：
（一）採購：指工程之定作。
（二）機關：指各級政府機關。
三、未盡事宜，依相關規定辦理。
";

fn workspace(root: &Path) -> Config {
    let mut config = Config::default();
    config.source_dir = root.join("data/regulations");
    config.formatted_dir = root.join("tmp/regulations_formatted");
    config.database = root.join("regulations.db");
    config.set_hierarchy_type("民法", HierarchyType::Type1);
    config.set_hierarchy_type("採購作業要點.txt", HierarchyType::Type2);

    fs::create_dir_all(&config.source_dir).unwrap();
    fs::write(config.source_dir.join("民法.txt"), CIVIL_CODE).unwrap();
    fs::write(config.source_dir.join("採購作業要點.txt"), GUIDELINE).unwrap();
    fs::write(config.source_dir.join("附件.txt"), "附件\n\n表一 申請書\n").unwrap();
    config
}

#[test]
fn imports_and_queries_a_workspace() {
    let tmp = tempfile::tempdir().unwrap();
    let config = workspace(tmp.path());
    let patterns = config.pattern_table().unwrap();
    let sources = collect_sources(&config.source_dir);
    assert_eq!(sources.len(), 3);

    let store = SqliteStore::open(&config.database).unwrap();
    let importer = Importer::new(&store, &patterns, &config);
    let completed = importer
        .import_all(&sources, &|_| {})
        .into_result()
        .unwrap();
    assert!(completed
        .iter()
        .all(|outcome| matches!(outcome, Outcome::Imported { .. })));

    let query = Query::new(&store);

    let civil = query.regulation("民法").unwrap();
    let levels: Vec<_> = civil.entries.iter().map(|e| e.level).collect();
    assert_eq!(levels, vec![1, 2, 3, 3, 1, 3]);
    let third = &civil.entries[5];
    assert_eq!(third.parent_id, Some(civil.entries[4].id));
    assert_eq!(query.ancestor_unit_numbers(third.id).unwrap(), "第二章, 第 3 條");

    let guideline = query.regulation("採購作業要點").unwrap();
    let summary: Vec<_> = guideline
        .entries
        .iter()
        .map(|e| (e.level, e.hierarchy_path.levels.join("/")))
        .collect();
    assert_eq!(
        summary,
        vec![
            (1, "一、".to_string()),
            (1, "二、".to_string()),
            (2, "二、/（一）".to_string()),
            (2, "二、/（二）".to_string()),
            (1, "三、".to_string()),
        ]
    );

    let appendix = query.regulation("附件").unwrap();
    assert_eq!(appendix.entries.len(), 2);
    assert!(appendix.entries.iter().all(|e| e.level == 0));

    let found = query.search("習慣", Some("民法"), false).unwrap();
    assert_eq!(found.len(), 2);
    assert!(query.search("習慣", Some("刑法"), false).unwrap().is_empty());
}

#[test]
fn second_run_skips_everything() {
    let tmp = tempfile::tempdir().unwrap();
    let config = workspace(tmp.path());
    let patterns = config.pattern_table().unwrap();
    let sources = collect_sources(&config.source_dir);

    {
        let store = SqliteStore::open(&config.database).unwrap();
        Importer::new(&store, &patterns, &config)
            .import_all(&sources, &|_| {})
            .into_result()
            .unwrap();
    }

    let store = SqliteStore::open(&config.database).unwrap();
    let completed = Importer::new(&store, &patterns, &config)
        .import_all(&sources, &|_| {})
        .into_result()
        .unwrap();
    assert!(completed
        .iter()
        .all(|outcome| matches!(outcome, Outcome::Skipped { .. })));
    assert_eq!(store.titles().unwrap().len(), 3);

    let civil = store.find_regulation("民法").unwrap().unwrap();
    assert_eq!(store.entries(civil.id).unwrap().len(), 6);
}

#[test]
fn annotated_files_feed_the_import() {
    let tmp = tempfile::tempdir().unwrap();
    let config = workspace(tmp.path());
    let patterns = config.pattern_table().unwrap();
    let sources = collect_sources(&config.source_dir);

    let headings = Annotator::new(&patterns, &config)
        .annotate_all(&sources, &|_| {})
        .into_result()
        .unwrap();
    assert_eq!(headings.iter().sum::<usize>(), 6 + 5);

    let annotated = fs::read_to_string(config.formatted_dir.join("民法.md")).unwrap();
    assert!(annotated.contains("\n# 第一章 總則\n## 第一節 通則\n### 第 1 條"));

    let store = SqliteStore::open(&config.database).unwrap();
    Importer::new(&store, &patterns, &config)
        .from_formatted(true)
        .import_all(&sources, &|_| {})
        .into_result()
        .unwrap();
    assert_eq!(store.titles().unwrap().len(), 3);
}
