fn main() {
  inscriber::main()
}
