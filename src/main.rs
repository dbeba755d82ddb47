fn main() {
    adb_desk_lib::run()
}
