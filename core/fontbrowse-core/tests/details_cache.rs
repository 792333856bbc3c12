/// Concurrent use of the details cache from many tasks.
use std::sync::Arc;
use std::time::Duration;

use fontbrowse_core::catalog::Font;
use fontbrowse_core::details::{DetailsCache, DetailsLookup};
use fontbrowse_core::reader::{MemoryFont, MemoryReader};

fn fonts(count: usize) -> (MemoryReader, Vec<Font>) {
    let mut reader = MemoryReader::new().with_delay(Duration::from_millis(10));
    let mut fonts = Vec::new();
    for i in 0..count {
        let file = format!("/fonts/{i}.otf");
        let name = format!("Face {i}");
        reader = reader.with_font(
            &file,
            MemoryFont::new("Face", &name, "Regular").with_features(&["kern"]),
        );
        fonts.push(Font::new(file, name, "Regular"));
    }
    (reader, fonts)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_tasks_read_each_font_once() {
    let (reader, fonts) = fonts(8);
    let reader = Arc::new(reader);
    let cache = Arc::new(DetailsCache::new(reader.clone()));

    let mut handles = Vec::new();
    for _ in 0..4 {
        for font in fonts.clone() {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move { cache.get_or_load(&font).await }));
        }
    }
    for handle in handles {
        let details = handle.await.expect("task");
        assert!(details.has_feature("kern"));
    }

    assert_eq!(reader.detail_read_count(), fonts.len());
    assert_eq!(cache.len(), fonts.len());
}

#[tokio::test]
async fn load_all_skips_cached_and_tolerates_unknown_files() {
    let (reader, mut fonts) = fonts(3);
    let reader = Arc::new(reader);
    let cache = Arc::new(DetailsCache::new(reader.clone()));

    cache.get_or_load(&fonts[0]).await;
    fonts.push(Font::new("/fonts/missing.otf", "Missing", "Regular"));
    cache.load_all(fonts.clone()).await;

    assert_eq!(reader.detail_read_count(), 4);
    assert!(cache.peek("Missing").expect("cached").is_unavailable());

    let snapshot = cache.snapshot();
    assert_eq!(snapshot.len(), 4);
    assert_eq!(snapshot.version(), cache.version());
}
