use cbg::SoaMap;

fn main() {
    let mut map = SoaMap::<u64, String>::new();

    map.insert(1, "hello".to_string());

    assert!(map.contains(&1));

    let value = map.get(&1);

    println!("Value: {:?}", value);
}
